//! The tree-walking evaluator. Runs directly over the AST produced by `crate::parser` and
//! annotated by `crate::resolver` -- there is no bytecode or intermediate representation in
//! between. `evaluate` handles expressions and returns a `Value`; `execute` handles statements
//! and returns a `Signal`, which is how `return` propagates out of nested blocks without being
//! folded into the error type.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{BinaryOp, Expr, ExprId, ExprKind, LiteralValue, LogicalOp, Stmt, UnaryOp};
use crate::callable::{clock, Callable};
use crate::environment::{EnvRef, Environment};
use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::{LoxClass, LoxFunction, LoxInstance, Value};

/// What executing a statement produced, beyond any side effects: either nothing in particular
/// (`Normal`) or a `return` value unwinding out of the current function call. Deliberately not an
/// error variant -- a `return` is ordinary control flow, not a failure, and keeping it out of
/// `RuntimeError` keeps that type describing only things that are actually wrong with the
/// program.
#[derive(Debug, Clone)]
pub enum Signal {
	Normal,
	Return(Value),
}

pub struct Interpreter {
	globals: EnvRef,
	environment: EnvRef,
	locals: HashMap<ExprId, usize>,
}

impl Interpreter {
	/// Builds a fresh interpreter, seeding the global scope with native functions and wiring in
	/// the scope-distance table the resolver computed for this program.
	#[must_use]
	pub fn new(locals: HashMap<ExprId, usize>) -> Self {
		let globals = Environment::global();
		globals.define("clock", Value::NativeFunction(Rc::new(clock())));
		Self { globals: Rc::clone(&globals), environment: globals, locals }
	}

	/// Runs a whole program, statement by statement. Stops at the first runtime error: unlike the
	/// static phases, which collect every diagnostic they can find, evaluation has side effects
	/// and can't meaningfully continue past a failure.
	pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
		for statement in statements {
			self.execute(statement)?;
		}
		Ok(())
	}

	fn execute(&mut self, statement: &Stmt) -> Result<Signal, RuntimeError> {
		match statement {
			Stmt::Expression(expr) => {
				self.evaluate(expr)?;
				Ok(Signal::Normal)
			},
			Stmt::Print(expr) => {
				let value = self.evaluate(expr)?;
				println!("{value}");
				Ok(Signal::Normal)
			},
			Stmt::Var { name, initializer } => {
				let value = match initializer {
					Some(expr) => self.evaluate(expr)?,
					None => Value::Nil,
				};
				self.environment.define(name.lexeme.clone(), value);
				Ok(Signal::Normal)
			},
			Stmt::Block(statements) => self.execute_block(statements, Environment::child(&self.environment)),
			Stmt::If { condition, then_branch, else_branch } => {
				if self.evaluate(condition)?.is_truthy() {
					self.execute(then_branch)
				} else if let Some(else_branch) = else_branch {
					self.execute(else_branch)
				} else {
					Ok(Signal::Normal)
				}
			},
			Stmt::While { condition, body } => {
				while self.evaluate(condition)?.is_truthy() {
					match self.execute(body)? {
						Signal::Normal => {},
						signal @ Signal::Return(_) => return Ok(signal),
					}
				}
				Ok(Signal::Normal)
			},
			Stmt::Function(declaration) => {
				let function = LoxFunction::new(Rc::new(declaration.clone()), Rc::clone(&self.environment), false);
				self.environment.define(declaration.name.lexeme.clone(), Value::Function(Rc::new(function)));
				Ok(Signal::Normal)
			},
			Stmt::Return { value, .. } => {
				let value = match value {
					Some(expr) => self.evaluate(expr)?,
					None => Value::Nil,
				};
				Ok(Signal::Return(value))
			},
			Stmt::Class { name, superclass, methods } => self.execute_class(name, superclass.as_ref(), methods),
		}
	}

	/// Runs `statements` in a fresh child scope, restoring the caller's environment afterward no
	/// matter how this returns -- normally, via an error propagated with `?`, or via a `return`
	/// signal bubbling out. The restore is an RAII guard (`BlockGuard` below) rather than a
	/// manual "do the work, then restore" pair, so a `?` partway through can't skip it.
	pub fn execute_block(&mut self, statements: &[Stmt], environment: EnvRef) -> Result<Signal, RuntimeError> {
		let previous = std::mem::replace(&mut self.environment, environment);
		let mut guard = BlockGuard { interpreter: self, previous: Some(previous) };

		for statement in statements {
			match guard.interpreter.execute(statement)? {
				Signal::Normal => {},
				signal @ Signal::Return(_) => return Ok(signal),
			}
		}
		Ok(Signal::Normal)
	}

	fn execute_class(&mut self, name: &Token, superclass_expr: Option<&Expr>, methods: &[crate::ast::FunctionDecl]) -> Result<Signal, RuntimeError> {
		let superclass = match superclass_expr {
			Some(expr) => match self.evaluate(expr)? {
				Value::Class(class) => Some(class),
				_ => return Err(RuntimeError::SuperclassMustBeClass { line: name.line }),
			},
			None => None,
		};

		// Defined as `nil` first so a method body can close over the class's own name (e.g. to
		// construct more instances of itself) before the class value actually exists.
		self.environment.define(name.lexeme.clone(), Value::Nil);

		let method_environment = if let Some(superclass) = &superclass {
			let env = Environment::child(&self.environment);
			env.define("super", Value::Class(Rc::clone(superclass)));
			env
		} else {
			Rc::clone(&self.environment)
		};

		let mut method_table = HashMap::new();
		for method in methods {
			let is_initializer = method.name.lexeme == "init";
			let function = LoxFunction::new(Rc::new(method.clone()), Rc::clone(&method_environment), is_initializer);
			method_table.insert(method.name.lexeme.clone(), Rc::new(function));
		}

		let class = Rc::new(LoxClass::new(name.lexeme.clone(), superclass, method_table));
		self.environment.assign(&name.lexeme, Value::Class(class), name.line)?;

		Ok(Signal::Normal)
	}

	fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
		match &expr.kind {
			ExprKind::Literal(literal) => Ok(literal_value(literal)),
			ExprKind::Grouping(inner) => self.evaluate(inner),
			ExprKind::Unary { op, op_token, operand } => self.evaluate_unary(*op, op_token, operand),
			ExprKind::Binary { left, op, op_token, right } => self.evaluate_binary(left, *op, op_token, right),
			ExprKind::Logical { left, op, right } => self.evaluate_logical(left, *op, right),
			ExprKind::Variable { name } => self.lookup_variable(name, expr.id),
			ExprKind::Assign { name, value } => self.evaluate_assign(name, value, expr.id),
			ExprKind::Call { callee, paren, arguments } => self.evaluate_call(callee, paren, arguments),
			ExprKind::Get { object, name } => self.evaluate_get(object, name),
			ExprKind::Set { object, name, value } => self.evaluate_set(object, name, value),
			ExprKind::This { keyword } => self.lookup_variable(keyword, expr.id),
			ExprKind::Super { keyword, method } => self.evaluate_super(expr.id, keyword, method),
		}
	}

	fn lookup_variable(&self, name: &Token, expr_id: ExprId) -> Result<Value, RuntimeError> {
		if let Some(&distance) = self.locals.get(&expr_id) {
			Ok(self.environment.get_at(distance, &name.lexeme))
		} else {
			self.globals.get(&name.lexeme, name.line)
		}
	}

	fn evaluate_assign(&mut self, name: &Token, value_expr: &Expr, expr_id: ExprId) -> Result<Value, RuntimeError> {
		let value = self.evaluate(value_expr)?;
		if let Some(&distance) = self.locals.get(&expr_id) {
			self.environment.assign_at(distance, &name.lexeme, value.clone());
		} else {
			self.globals.assign(&name.lexeme, value.clone(), name.line)?;
		}
		Ok(value)
	}

	fn evaluate_unary(&mut self, op: UnaryOp, op_token: &Token, operand: &Expr) -> Result<Value, RuntimeError> {
		let operand_value = self.evaluate(operand)?;
		match op {
			UnaryOp::Negate => match operand_value {
				Value::Int(n) => Ok(Value::Int(-n)),
				Value::Double(n) => Ok(Value::Double(-n)),
				_ => Err(RuntimeError::OperandMustBeNumber { line: op_token.line }),
			},
			UnaryOp::Not => Ok(Value::Bool(!operand_value.is_truthy())),
		}
	}

	fn evaluate_logical(&mut self, left: &Expr, op: LogicalOp, right: &Expr) -> Result<Value, RuntimeError> {
		let left_value = self.evaluate(left)?;
		match op {
			LogicalOp::Or if left_value.is_truthy() => return Ok(left_value),
			LogicalOp::And if !left_value.is_truthy() => return Ok(left_value),
			LogicalOp::Or | LogicalOp::And => {},
		}
		self.evaluate(right)
	}

	fn evaluate_binary(&mut self, left: &Expr, op: BinaryOp, op_token: &Token, right: &Expr) -> Result<Value, RuntimeError> {
		let left_value = self.evaluate(left)?;
		let right_value = self.evaluate(right)?;
		let line = op_token.line;

		match op {
			BinaryOp::Add => {
				if let (Value::Str(a), Value::Str(b)) = (&left_value, &right_value) {
					return Ok(Value::Str(format!("{a}{b}")));
				}
				match numeric_pair(&left_value, &right_value) {
					Some(NumPair::Ints(a, b)) => Ok(Value::Int(a.wrapping_add(b))),
					Some(NumPair::Doubles(a, b)) => Ok(Value::Double(a + b)),
					None => Err(RuntimeError::OperandsMustBeNumbersOrStrings { line }),
				}
			},
			BinaryOp::Subtract => numeric_op(&left_value, &right_value, line, i64::wrapping_sub, |a, b| a - b),
			BinaryOp::Multiply => numeric_op(&left_value, &right_value, line, i64::wrapping_mul, |a, b| a * b),
			BinaryOp::Divide => match numeric_pair(&left_value, &right_value) {
				Some(NumPair::Ints(_, 0)) => Err(RuntimeError::DivisionByZero { line }),
				Some(NumPair::Ints(a, b)) => Ok(Value::Int(a.wrapping_div(b))),
				Some(NumPair::Doubles(_, b)) if b == 0.0 => Err(RuntimeError::DivisionByZero { line }),
				Some(NumPair::Doubles(a, b)) => Ok(Value::Double(a / b)),
				None => Err(RuntimeError::OperandsMustBeNumbers { line }),
			},
			BinaryOp::Greater | BinaryOp::GreaterEqual | BinaryOp::Less | BinaryOp::LessEqual => match numeric_pair(&left_value, &right_value) {
				Some(NumPair::Ints(a, b)) => Ok(Value::Bool(compare(op, a, b))),
				Some(NumPair::Doubles(a, b)) => Ok(Value::Bool(compare(op, a, b))),
				None => Err(RuntimeError::OperandsMustBeNumbers { line }),
			},
			BinaryOp::Equal => Ok(Value::Bool(left_value == right_value)),
			BinaryOp::NotEqual => Ok(Value::Bool(left_value != right_value)),
		}
	}

	fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> Result<Value, RuntimeError> {
		let callee_value = self.evaluate(callee)?;

		let mut argument_values = Vec::with_capacity(arguments.len());
		for argument in arguments {
			argument_values.push(self.evaluate(argument)?);
		}

		let callable = callee_value.as_callable().ok_or(RuntimeError::NotCallable { line: paren.line })?;
		if callable.arity() != argument_values.len() {
			return Err(RuntimeError::ArityMismatch { line: paren.line, expected: callable.arity(), actual: argument_values.len() });
		}

		match &callee_value {
			Value::Class(class) => self.instantiate(Rc::clone(class), argument_values),
			_ => callable.call(self, argument_values),
		}
	}

	fn evaluate_get(&mut self, object: &Expr, name: &Token) -> Result<Value, RuntimeError> {
		let object_value = self.evaluate(object)?;
		let Value::Instance(instance) = &object_value else {
			return Err(RuntimeError::PropertyAccessOnNonInstance { line: name.line });
		};

		if let Some(value) = instance.field(&name.lexeme) {
			return Ok(value);
		}
		if let Some(method) = instance.class.find_method(&name.lexeme) {
			return Ok(Value::Function(Rc::new(method.bind(Rc::clone(instance)))));
		}
		Err(RuntimeError::UndefinedProperty { line: name.line, name: name.lexeme.clone() })
	}

	fn evaluate_set(&mut self, object: &Expr, name: &Token, value: &Expr) -> Result<Value, RuntimeError> {
		let object_value = self.evaluate(object)?;
		let Value::Instance(instance) = &object_value else {
			return Err(RuntimeError::PropertyAccessOnNonInstance { line: name.line });
		};

		let value = self.evaluate(value)?;
		instance.set(name.lexeme.clone(), value.clone());
		Ok(value)
	}

	fn evaluate_super(&mut self, expr_id: ExprId, keyword: &Token, method: &Token) -> Result<Value, RuntimeError> {
		let distance = *self.locals.get(&expr_id).expect("resolver always assigns 'super' a scope distance");
		let Value::Class(superclass) = self.environment.get_at(distance, "super") else {
			unreachable!("'super' always resolves to a class value");
		};
		// The resolver pushes the `this` scope one level nearer than the `super` scope (see
		// `Resolver::resolve_class`), so the instance is always exactly one hop closer.
		let Value::Instance(instance) = self.environment.get_at(distance - 1, "this") else {
			unreachable!("'this' always resolves to an instance value");
		};

		let found = superclass.find_method(&method.lexeme).ok_or_else(|| RuntimeError::UndefinedProperty { line: method.line, name: method.lexeme.clone() })?;
		Ok(Value::Function(Rc::new(found.bind(instance))))
	}

	/// Constructs a new instance of `class`, running its `init` method (if any) against the
	/// arguments already checked for arity by the caller.
	pub fn instantiate(&mut self, class: Rc<LoxClass>, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
		let instance = Rc::new(LoxInstance::new(Rc::clone(&class)));
		if let Some(initializer) = class.find_method("init") {
			let bound = initializer.bind(Rc::clone(&instance));
			bound.call(self, arguments)?;
		}
		Ok(Value::Instance(instance))
	}
}

struct BlockGuard<'i> {
	interpreter: &'i mut Interpreter,
	previous: Option<EnvRef>,
}

impl Drop for BlockGuard<'_> {
	fn drop(&mut self) {
		if let Some(previous) = self.previous.take() {
			self.interpreter.environment = previous;
		}
	}
}

fn literal_value(literal: &LiteralValue) -> Value {
	match literal {
		LiteralValue::Nil => Value::Nil,
		LiteralValue::Bool(value) => Value::Bool(*value),
		LiteralValue::Int(value) => Value::Int(*value),
		LiteralValue::Double(value) => Value::Double(*value),
		LiteralValue::Str(value) => Value::Str(value.clone()),
	}
}

enum NumPair {
	Ints(i64, i64),
	Doubles(f64, f64),
}

fn numeric_pair(left: &Value, right: &Value) -> Option<NumPair> {
	match (left, right) {
		(Value::Int(a), Value::Int(b)) => Some(NumPair::Ints(*a, *b)),
		(Value::Int(a), Value::Double(b)) => Some(NumPair::Doubles(*a as f64, *b)),
		(Value::Double(a), Value::Int(b)) => Some(NumPair::Doubles(*a, *b as f64)),
		(Value::Double(a), Value::Double(b)) => Some(NumPair::Doubles(*a, *b)),
		_ => None,
	}
}

fn numeric_op(left: &Value, right: &Value, line: usize, int_op: impl Fn(i64, i64) -> i64, double_op: impl Fn(f64, f64) -> f64) -> Result<Value, RuntimeError> {
	match numeric_pair(left, right) {
		Some(NumPair::Ints(a, b)) => Ok(Value::Int(int_op(a, b))),
		Some(NumPair::Doubles(a, b)) => Ok(Value::Double(double_op(a, b))),
		None => Err(RuntimeError::OperandsMustBeNumbers { line }),
	}
}

fn compare<T: PartialOrd>(op: BinaryOp, a: T, b: T) -> bool {
	match op {
		BinaryOp::Greater => a > b,
		BinaryOp::GreaterEqual => a >= b,
		BinaryOp::Less => a < b,
		BinaryOp::LessEqual => a <= b,
		_ => unreachable!("compare is only ever called with a comparison operator"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lexer::scan;
	use crate::parser::parse;
	use crate::resolver::resolve;

	fn run(source: &str) -> Result<(), RuntimeError> {
		let (tokens, scan_errors) = scan(source);
		assert!(scan_errors.is_empty());
		let (statements, parse_errors) = parse(tokens);
		assert!(parse_errors.is_empty(), "{parse_errors:?}");
		let (locals, resolve_errors) = resolve(&statements);
		assert!(resolve_errors.is_empty(), "{resolve_errors:?}");
		Interpreter::new(locals).interpret(&statements)
	}

	#[test]
	fn integer_arithmetic_stays_integral() {
		// Indirect check: division by zero on pure integers must trip the dedicated error, not
		// silently produce infinity the way floating point division would.
		assert!(matches!(run("print 1 / 0;"), Err(RuntimeError::DivisionByZero { .. })));
	}

	#[test]
	fn string_concatenation_with_plus() {
		assert!(run("print \"a\" + \"b\";").is_ok());
	}

	#[test]
	fn adding_a_number_to_a_string_is_a_runtime_error() {
		assert!(matches!(run("print \"a\" + 1;"), Err(RuntimeError::OperandsMustBeNumbersOrStrings { .. })));
	}

	#[test]
	fn calling_a_non_callable_is_a_runtime_error() {
		assert!(matches!(run("var x = 1; x();"), Err(RuntimeError::NotCallable { .. })));
	}

	#[test]
	fn arity_mismatch_is_a_runtime_error() {
		assert!(matches!(run("fun f(a) { return a; } f();"), Err(RuntimeError::ArityMismatch { expected: 1, actual: 0, .. })));
	}

	#[test]
	fn closures_capture_their_defining_environment() {
		let source = "
			fun makeCounter() {
				var i = 0;
				fun count() {
					i = i + 1;
					return i;
				}
				return count;
			}
			var counter = makeCounter();
			print counter();
			print counter();
		";
		assert!(run(source).is_ok());
	}

	#[test]
	fn class_instantiation_and_method_dispatch() {
		let source = "
			class Greeter {
				init(name) {
					this.name = name;
				}
				greet() {
					return \"hi \" + this.name;
				}
			}
			var g = Greeter(\"a\");
			print g.greet();
		";
		assert!(run(source).is_ok());
	}

	#[test]
	fn inherited_methods_resolve_via_super() {
		let source = "
			class A {
				hello() { return \"a\"; }
			}
			class B < A {
				hello() { return super.hello() + \"b\"; }
			}
			print B().hello();
		";
		assert!(run(source).is_ok());
	}

	#[test]
	fn undefined_property_is_a_runtime_error() {
		let source = "
			class A {}
			var a = A();
			a.missing;
		";
		assert!(matches!(run(source), Err(RuntimeError::UndefinedProperty { .. })));
	}
}
