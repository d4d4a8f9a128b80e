//! The resolver: a static pass between parsing and evaluation that walks the AST once to compute,
//! for every variable reference, how many enclosing scopes out its binding lives. That distance is
//! recorded in a side table keyed by `ExprId` rather than baked back into the AST, so the AST stays
//! an immutable, purely syntactic structure and the one piece of semantic analysis this
//! interpreter does lives in exactly one place.
//!
//! This also doubles as the home for a handful of compile-time checks that don't need full
//! evaluation to catch: returning from top-level code, referencing `this`/`super` outside a
//! class, and reading a local variable from its own initializer (`var a = a;`).

use std::collections::HashMap;

use crate::ast::{Expr, ExprId, ExprKind, FunctionDecl, Stmt};
use crate::error::{ErrorLocation, ResolveError};
use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
	None,
	Function,
	Initializer,
	Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassKind {
	None,
	Class,
	Subclass,
}

/// Runs the resolver over a whole program. Returns the scope-distance table (consumed by
/// `crate::interpreter`) and any static errors found along the way.
pub fn resolve(statements: &[Stmt]) -> (HashMap<ExprId, usize>, Vec<ResolveError>) {
	let mut resolver = Resolver::new();
	resolver.resolve_statements(statements);
	(resolver.locals, resolver.errors)
}

struct Resolver {
	/// One entry per enclosing block/function scope, innermost last. The value records whether a
	/// name has finished its own initializer yet (`declare` inserts `false`, `define` flips it to
	/// `true`), which is what lets `var a = a;` be caught rather than silently shadowing an outer
	/// `a`. The global scope is never pushed here; unresolved names simply fall through to runtime
	/// lookup.
	scopes: Vec<HashMap<String, bool>>,
	locals: HashMap<ExprId, usize>,
	errors: Vec<ResolveError>,
	current_function: FunctionKind,
	current_class: ClassKind,
}

impl Resolver {
	fn new() -> Self {
		Self { scopes: Vec::new(), locals: HashMap::new(), errors: Vec::new(), current_function: FunctionKind::None, current_class: ClassKind::None }
	}

	fn error(&mut self, token: &Token, message: impl Into<String>) {
		self.errors.push(ResolveError { line: token.line, where_: ErrorLocation::of_token(token), message: message.into() });
	}

	fn begin_scope(&mut self) {
		self.scopes.push(HashMap::new());
	}

	fn end_scope(&mut self) {
		self.scopes.pop();
	}

	fn declare(&mut self, name: &Token) {
		if let Some(scope) = self.scopes.last_mut() {
			if scope.contains_key(&name.lexeme) {
				self.error(name, "Already a variable with this name in this scope.");
			}
			scope.insert(name.lexeme.clone(), false);
		}
	}

	fn define(&mut self, name: &Token) {
		if let Some(scope) = self.scopes.last_mut() {
			scope.insert(name.lexeme.clone(), true);
		}
	}

	fn resolve_local(&mut self, expr_id: ExprId, name: &str) {
		for (distance, scope) in self.scopes.iter().rev().enumerate() {
			if scope.contains_key(name) {
				self.locals.insert(expr_id, distance);
				return;
			}
		}
		// Not found in any tracked scope: treated as global, resolved by the interpreter at
		// runtime instead.
	}

	fn resolve_statements(&mut self, statements: &[Stmt]) {
		for statement in statements {
			self.resolve_statement(statement);
		}
	}

	fn resolve_statement(&mut self, statement: &Stmt) {
		match statement {
			Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),
			Stmt::Var { name, initializer } => {
				self.declare(name);
				if let Some(initializer) = initializer {
					self.resolve_expr(initializer);
				}
				self.define(name);
			},
			Stmt::Block(statements) => {
				self.begin_scope();
				self.resolve_statements(statements);
				self.end_scope();
			},
			Stmt::If { condition, then_branch, else_branch } => {
				self.resolve_expr(condition);
				self.resolve_statement(then_branch);
				if let Some(else_branch) = else_branch {
					self.resolve_statement(else_branch);
				}
			},
			Stmt::While { condition, body } => {
				self.resolve_expr(condition);
				self.resolve_statement(body);
			},
			Stmt::Function(declaration) => {
				self.declare(&declaration.name);
				self.define(&declaration.name);
				self.resolve_function(declaration, FunctionKind::Function);
			},
			Stmt::Return { keyword, value } => {
				if self.current_function == FunctionKind::None {
					self.error(keyword, "Can't return from top-level code.");
				}
				if let Some(value) = value {
					if self.current_function == FunctionKind::Initializer {
						self.error(keyword, "Can't return a value from an initializer.");
					}
					self.resolve_expr(value);
				}
			},
			Stmt::Class { name, superclass, methods } => self.resolve_class(name, superclass.as_ref(), methods),
		}
	}

	fn resolve_class(&mut self, name: &Token, superclass: Option<&Expr>, methods: &[FunctionDecl]) {
		let enclosing_class = self.current_class;
		self.current_class = ClassKind::Class;

		self.declare(name);
		self.define(name);

		if let Some(ExprKind::Variable { name: superclass_name }) = superclass.map(|expr| &expr.kind) {
			if superclass_name.lexeme == name.lexeme {
				self.error(superclass_name, "A class can't inherit from itself.");
			}
			self.current_class = ClassKind::Subclass;
			self.resolve_expr(superclass.expect("checked Some above"));

			self.begin_scope();
			self.scopes.last_mut().expect("scope just pushed").insert("super".to_owned(), true);
		}

		self.begin_scope();
		self.scopes.last_mut().expect("scope just pushed").insert("this".to_owned(), true);

		for method in methods {
			let kind = if method.name.lexeme == "init" { FunctionKind::Initializer } else { FunctionKind::Method };
			self.resolve_function(method, kind);
		}

		self.end_scope();

		if superclass.is_some() {
			self.end_scope();
		}

		self.current_class = enclosing_class;
	}

	fn resolve_function(&mut self, declaration: &FunctionDecl, kind: FunctionKind) {
		let enclosing_function = self.current_function;
		self.current_function = kind;

		self.begin_scope();
		for param in &declaration.params {
			self.declare(param);
			self.define(param);
		}
		self.resolve_statements(&declaration.body);
		self.end_scope();

		self.current_function = enclosing_function;
	}

	fn resolve_expr(&mut self, expr: &Expr) {
		match &expr.kind {
			ExprKind::Literal(_) => {},
			ExprKind::Grouping(inner) => self.resolve_expr(inner),
			ExprKind::Unary { operand, .. } => self.resolve_expr(operand),
			ExprKind::Binary { left, right, .. } => {
				self.resolve_expr(left);
				self.resolve_expr(right);
			},
			ExprKind::Logical { left, right, .. } => {
				self.resolve_expr(left);
				self.resolve_expr(right);
			},
			ExprKind::Variable { name } => {
				if self.scopes.last().is_some_and(|scope| scope.get(&name.lexeme) == Some(&false)) {
					self.error(name, "Can't read local variable in its own initializer.");
				}
				self.resolve_local(expr.id, &name.lexeme);
			},
			ExprKind::Assign { name, value } => {
				self.resolve_expr(value);
				self.resolve_local(expr.id, &name.lexeme);
			},
			ExprKind::Call { callee, arguments, .. } => {
				self.resolve_expr(callee);
				for argument in arguments {
					self.resolve_expr(argument);
				}
			},
			ExprKind::Get { object, .. } => self.resolve_expr(object),
			ExprKind::Set { object, value, .. } => {
				self.resolve_expr(value);
				self.resolve_expr(object);
			},
			ExprKind::This { keyword } => {
				if self.current_class == ClassKind::None {
					self.error(keyword, "Can't use 'this' outside of a class.");
					return;
				}
				self.resolve_local(expr.id, &keyword.lexeme);
			},
			ExprKind::Super { keyword, .. } => {
				match self.current_class {
					ClassKind::None => self.error(keyword, "Can't use 'super' outside of a class."),
					ClassKind::Class => self.error(keyword, "Can't use 'super' in a class with no superclass."),
					ClassKind::Subclass => {},
				}
				self.resolve_local(expr.id, &keyword.lexeme);
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lexer::scan;
	use crate::parser::parse;

	fn resolve_source(source: &str) -> (HashMap<ExprId, usize>, Vec<ResolveError>) {
		let (tokens, scan_errors) = scan(source);
		assert!(scan_errors.is_empty());
		let (statements, parse_errors) = parse(tokens);
		assert!(parse_errors.is_empty(), "{parse_errors:?}");
		resolve(&statements)
	}

	#[test]
	fn self_referencing_initializer_is_an_error() {
		let (_, errors) = resolve_source("{ var a = a; }");
		assert_eq!(errors.len(), 1);
		assert!(errors[0].message.contains("own initializer"));
	}

	#[test]
	fn shadowed_local_resolves_to_the_nearest_scope() {
		let (locals, errors) = resolve_source("var a = 1; { var a = 2; print a; }");
		assert!(errors.is_empty());
		assert_eq!(locals.values().copied().collect::<Vec<_>>(), vec![0]);
	}

	#[test]
	fn top_level_return_is_an_error() {
		let (_, errors) = resolve_source("return 1;");
		assert_eq!(errors.len(), 1);
		assert!(errors[0].message.contains("top-level"));
	}

	#[test]
	fn this_outside_class_is_an_error() {
		let (_, errors) = resolve_source("print this;");
		assert_eq!(errors.len(), 1);
		assert!(errors[0].message.contains("'this'"));
	}

	#[test]
	fn class_inheriting_from_itself_is_an_error() {
		let (_, errors) = resolve_source("class A < A {}");
		assert_eq!(errors.len(), 1);
		assert!(errors[0].message.contains("inherit from itself"));
	}

	#[test]
	fn duplicate_local_declaration_is_an_error() {
		let (_, errors) = resolve_source("{ var a = 1; var a = 2; }");
		assert_eq!(errors.len(), 1);
		assert!(errors[0].message.contains("Already a variable"));
	}
}
