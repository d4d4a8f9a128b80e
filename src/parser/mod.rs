//! The parser. Pure recursive-descent with a single-token lookahead, consuming the scanner's
//! token stream left-to-right and producing an ordered `Vec<Stmt>` -- see the grammar table in
//! the spec this interpreter implements (§4.1) for the full precedence climb.

use crate::ast::{BinaryOp, Expr, ExprKind, FunctionDecl, LiteralValue, LogicalOp, Stmt, UnaryOp};
use crate::error::{ErrorLocation, ParseError};
use crate::token::{LiteralPayload, Token, TokenKind};

const MAX_ARGS: usize = 255;

/// Parses a complete token stream into a program (a sequence of top-level statements).
///
/// Never aborts on the first error: each failed `declaration` is caught, reported, and
/// resynchronized past, so a single run can surface more than one diagnostic. Returns every
/// statement that parsed successfully alongside every error encountered; the caller (the driver)
/// treats any non-empty error list as "had static error" and does not evaluate the partial AST.
pub fn parse(tokens: Vec<Token>) -> (Vec<Stmt>, Vec<ParseError>) {
	let mut parser = Parser::new(tokens);
	let mut statements = Vec::new();

	while !parser.is_at_end() {
		match parser.declaration() {
			Ok(statement) => statements.push(statement),
			Err(error) => {
				parser.errors.push(error);
				parser.synchronize();
			},
		}
	}

	(statements, parser.errors)
}

struct Parser {
	tokens: Vec<Token>,
	current: usize,
	/// Errors that are reported without aborting the statement they occur in, such as an invalid
	/// assignment target -- collected here instead of returned from the rule that found them, so
	/// parsing keeps going past them in the same way `declaration`'s own error recovery does for
	/// statement-level failures.
	errors: Vec<ParseError>,
}

type ParseResult<T> = Result<T, ParseError>;

impl Parser {
	fn new(tokens: Vec<Token>) -> Self {
		Self { tokens, current: 0, errors: Vec::new() }
	}

	// --- token-stream primitives -------------------------------------------------------------

	fn peek(&self) -> &Token {
		&self.tokens[self.current]
	}

	fn previous(&self) -> &Token {
		&self.tokens[self.current - 1]
	}

	fn is_at_end(&self) -> bool {
		self.peek().kind == TokenKind::Eof
	}

	fn check(&self, kind: TokenKind) -> bool {
		!self.is_at_end() && self.peek().kind == kind
	}

	fn advance(&mut self) -> &Token {
		if !self.is_at_end() {
			self.current += 1;
		}
		self.previous()
	}

	fn matches(&mut self, kinds: &[TokenKind]) -> bool {
		for &kind in kinds {
			if self.check(kind) {
				self.advance();
				return true;
			}
		}
		false
	}

	fn error_at_current(&self, message: impl Into<String>) -> ParseError {
		let token = self.peek();
		ParseError { line: token.line, where_: ErrorLocation::of_token(token), message: message.into() }
	}

	fn consume(&mut self, kind: TokenKind, message: impl Into<String>) -> ParseResult<&Token> {
		if self.check(kind) {
			return Ok(self.advance());
		}
		Err(self.error_at_current(message))
	}

	/// After a parse error, advance tokens until we're likely at the start of a new statement.
	/// Bounds cascading diagnostics caused by the parser being "lost" inside a malformed
	/// construct.
	fn synchronize(&mut self) {
		self.advance();
		while !self.is_at_end() {
			if self.previous().kind == TokenKind::Semicolon {
				return;
			}
			match self.peek().kind {
				TokenKind::Class | TokenKind::Fun | TokenKind::Var | TokenKind::For | TokenKind::If | TokenKind::While | TokenKind::Print | TokenKind::Return => return,
				_ => {
					self.advance();
				},
			}
		}
	}

	// --- declarations --------------------------------------------------------------------------

	fn declaration(&mut self) -> ParseResult<Stmt> {
		if self.matches(&[TokenKind::Class]) {
			return self.class_declaration();
		}
		if self.matches(&[TokenKind::Fun]) {
			return Ok(Stmt::Function(self.function("function")?));
		}
		if self.matches(&[TokenKind::Var]) {
			return self.var_declaration();
		}
		self.statement()
	}

	fn class_declaration(&mut self) -> ParseResult<Stmt> {
		let name = self.consume(TokenKind::Identifier, "Expect class name.")?.clone();

		let superclass = if self.matches(&[TokenKind::Less]) {
			let superclass_name = self.consume(TokenKind::Identifier, "Expect superclass name.")?.clone();
			Some(Expr::new(ExprKind::Variable { name: superclass_name }))
		} else {
			None
		};

		self.consume(TokenKind::LeftBrace, "Expect '{' before class body.")?;

		let mut methods = Vec::new();
		while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
			methods.push(self.function("method")?);
		}

		self.consume(TokenKind::RightBrace, "Expect '}' after class body.")?;

		Ok(Stmt::Class { name, superclass, methods })
	}

	fn function(&mut self, kind: &str) -> ParseResult<FunctionDecl> {
		let name = self.consume(TokenKind::Identifier, format!("Expect {kind} name."))?.clone();
		self.consume(TokenKind::LeftParen, format!("Expect '(' after {kind} name."))?;

		let mut params = Vec::new();
		if !self.check(TokenKind::RightParen) {
			loop {
				if params.len() >= MAX_ARGS {
					return Err(self.error_at_current(format!("Can't have more than {MAX_ARGS} parameters.")));
				}
				params.push(self.consume(TokenKind::Identifier, "Expect parameter name.")?.clone());
				if !self.matches(&[TokenKind::Comma]) {
					break;
				}
			}
		}
		self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;

		self.consume(TokenKind::LeftBrace, format!("Expect '{{' before {kind} body."))?;
		let body = self.block()?;

		Ok(FunctionDecl { name, params, body })
	}

	fn var_declaration(&mut self) -> ParseResult<Stmt> {
		let name = self.consume(TokenKind::Identifier, "Expect variable name.")?.clone();

		let initializer = if self.matches(&[TokenKind::Equal]) { Some(self.expression()?) } else { None };

		self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.")?;
		Ok(Stmt::Var { name, initializer })
	}

	// --- statements ----------------------------------------------------------------------------

	fn statement(&mut self) -> ParseResult<Stmt> {
		if self.matches(&[TokenKind::For]) {
			return self.for_statement();
		}
		if self.matches(&[TokenKind::If]) {
			return self.if_statement();
		}
		if self.matches(&[TokenKind::Print]) {
			return self.print_statement();
		}
		if self.matches(&[TokenKind::Return]) {
			return self.return_statement();
		}
		if self.matches(&[TokenKind::While]) {
			return self.while_statement();
		}
		if self.matches(&[TokenKind::LeftBrace]) {
			return Ok(Stmt::Block(self.block()?));
		}
		self.expression_statement()
	}

	fn for_statement(&mut self) -> ParseResult<Stmt> {
		self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;

		let initializer = if self.matches(&[TokenKind::Semicolon]) {
			None
		} else if self.matches(&[TokenKind::Var]) {
			Some(self.var_declaration()?)
		} else {
			Some(self.expression_statement()?)
		};

		let condition = if self.check(TokenKind::Semicolon) { None } else { Some(self.expression()?) };
		self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

		let increment = if self.check(TokenKind::RightParen) { None } else { Some(self.expression()?) };
		self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;

		let mut body = self.statement()?;

		// Desugar: for (I; C; U) B  ==  { I; while (C ?? true) { B; U; } }
		if let Some(increment) = increment {
			body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
		}

		let condition = condition.unwrap_or_else(|| Expr::new(ExprKind::Literal(LiteralValue::Bool(true))));
		body = Stmt::While { condition, body: Box::new(body) };

		if let Some(initializer) = initializer {
			body = Stmt::Block(vec![initializer, body]);
		}

		Ok(body)
	}

	fn if_statement(&mut self) -> ParseResult<Stmt> {
		self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
		let condition = self.expression()?;
		self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;

		let then_branch = Box::new(self.statement()?);
		// Dangling-else binds to the nearest preceding `if`: we greedily consume an `else` right
		// here rather than letting it float up to an enclosing `if`.
		let else_branch = if self.matches(&[TokenKind::Else]) { Some(Box::new(self.statement()?)) } else { None };

		Ok(Stmt::If { condition, then_branch, else_branch })
	}

	fn print_statement(&mut self) -> ParseResult<Stmt> {
		let value = self.expression()?;
		self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
		Ok(Stmt::Print(value))
	}

	fn return_statement(&mut self) -> ParseResult<Stmt> {
		let keyword = self.previous().clone();
		let value = if self.check(TokenKind::Semicolon) { None } else { Some(self.expression()?) };
		self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;
		Ok(Stmt::Return { keyword, value })
	}

	fn while_statement(&mut self) -> ParseResult<Stmt> {
		self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
		let condition = self.expression()?;
		self.consume(TokenKind::RightParen, "Expect ')' after condition.")?;
		let body = Box::new(self.statement()?);
		Ok(Stmt::While { condition, body })
	}

	fn block(&mut self) -> ParseResult<Vec<Stmt>> {
		let mut statements = Vec::new();
		while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
			statements.push(self.declaration()?);
		}
		self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;
		Ok(statements)
	}

	fn expression_statement(&mut self) -> ParseResult<Stmt> {
		let expr = self.expression()?;
		self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
		Ok(Stmt::Expression(expr))
	}

	// --- expressions (precedence climb, low to high) --------------------------------------------

	fn expression(&mut self) -> ParseResult<Expr> {
		self.assignment()
	}

	fn assignment(&mut self) -> ParseResult<Expr> {
		let expr = self.or()?;

		if self.matches(&[TokenKind::Equal]) {
			let equals = self.previous().clone();
			let value = self.assignment()?;

			return match expr.kind {
				ExprKind::Variable { name } => Ok(Expr::new(ExprKind::Assign { name, value: Box::new(value) })),
				ExprKind::Get { object, name } => Ok(Expr::new(ExprKind::Set { object, name, value: Box::new(value) })),
				// Reported, not thrown: the target is already fully parsed, so there's a perfectly
				// good expression to keep going with. Aborting the statement here would also throw
				// away whatever follows on the same line (e.g. the rest of a call's argument list).
				other => {
					self.errors.push(ParseError {
						line: equals.line,
						where_: ErrorLocation::of_token(&equals),
						message: "Invalid assignment target.".to_owned(),
					});
					Ok(Expr::new(other))
				},
			};
		}

		Ok(expr)
	}

	fn or(&mut self) -> ParseResult<Expr> {
		let mut expr = self.and()?;
		while self.matches(&[TokenKind::Or]) {
			let right = self.and()?;
			expr = Expr::new(ExprKind::Logical { left: Box::new(expr), op: LogicalOp::Or, right: Box::new(right) });
		}
		Ok(expr)
	}

	fn and(&mut self) -> ParseResult<Expr> {
		let mut expr = self.equality()?;
		while self.matches(&[TokenKind::And]) {
			let right = self.equality()?;
			expr = Expr::new(ExprKind::Logical { left: Box::new(expr), op: LogicalOp::And, right: Box::new(right) });
		}
		Ok(expr)
	}

	fn equality(&mut self) -> ParseResult<Expr> {
		let mut expr = self.comparison()?;
		while self.matches(&[TokenKind::BangEqual, TokenKind::EqualEqual]) {
			let op_token = self.previous().clone();
			let op = if op_token.kind == TokenKind::BangEqual { BinaryOp::NotEqual } else { BinaryOp::Equal };
			let right = self.comparison()?;
			expr = Expr::new(ExprKind::Binary { left: Box::new(expr), op, op_token, right: Box::new(right) });
		}
		Ok(expr)
	}

	fn comparison(&mut self) -> ParseResult<Expr> {
		let mut expr = self.addition()?;
		while self.matches(&[TokenKind::Greater, TokenKind::GreaterEqual, TokenKind::Less, TokenKind::LessEqual]) {
			let op_token = self.previous().clone();
			let op = match op_token.kind {
				TokenKind::Greater => BinaryOp::Greater,
				TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
				TokenKind::Less => BinaryOp::Less,
				_ => BinaryOp::LessEqual,
			};
			let right = self.addition()?;
			expr = Expr::new(ExprKind::Binary { left: Box::new(expr), op, op_token, right: Box::new(right) });
		}
		Ok(expr)
	}

	fn addition(&mut self) -> ParseResult<Expr> {
		let mut expr = self.multiplication()?;
		while self.matches(&[TokenKind::Minus, TokenKind::Plus]) {
			let op_token = self.previous().clone();
			let op = if op_token.kind == TokenKind::Minus { BinaryOp::Subtract } else { BinaryOp::Add };
			let right = self.multiplication()?;
			expr = Expr::new(ExprKind::Binary { left: Box::new(expr), op, op_token, right: Box::new(right) });
		}
		Ok(expr)
	}

	fn multiplication(&mut self) -> ParseResult<Expr> {
		let mut expr = self.unary()?;
		while self.matches(&[TokenKind::Slash, TokenKind::Star]) {
			let op_token = self.previous().clone();
			let op = if op_token.kind == TokenKind::Slash { BinaryOp::Divide } else { BinaryOp::Multiply };
			let right = self.unary()?;
			expr = Expr::new(ExprKind::Binary { left: Box::new(expr), op, op_token, right: Box::new(right) });
		}
		Ok(expr)
	}

	fn unary(&mut self) -> ParseResult<Expr> {
		if self.matches(&[TokenKind::Bang, TokenKind::Minus]) {
			let op_token = self.previous().clone();
			let op = if op_token.kind == TokenKind::Bang { UnaryOp::Not } else { UnaryOp::Negate };
			let operand = self.unary()?;
			return Ok(Expr::new(ExprKind::Unary { op, op_token, operand: Box::new(operand) }));
		}
		self.call()
	}

	fn call(&mut self) -> ParseResult<Expr> {
		let mut expr = self.primary()?;

		loop {
			if self.matches(&[TokenKind::LeftParen]) {
				expr = self.finish_call(expr)?;
			} else if self.matches(&[TokenKind::Dot]) {
				let name = self.consume(TokenKind::Identifier, "Expect property name after '.'.")?.clone();
				expr = Expr::new(ExprKind::Get { object: Box::new(expr), name });
			} else {
				break;
			}
		}

		Ok(expr)
	}

	fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
		let mut arguments = Vec::new();
		if !self.check(TokenKind::RightParen) {
			loop {
				if arguments.len() >= MAX_ARGS {
					// Reported but not fatal: parsing continues so later errors still surface.
					let error = self.error_at_current(format!("Can't have more than {MAX_ARGS} arguments."));
					// There is nothing useful to recover with other than dropping the error on
					// the floor here; the caller has no error channel for "soft" parse warnings.
					// We choose instead to propagate it as a hard error -- one malformed call is
					// enough to abandon this statement and resynchronize.
					return Err(error);
				}
				arguments.push(self.expression()?);
				if !self.matches(&[TokenKind::Comma]) {
					break;
				}
			}
		}

		let paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments.")?.clone();
		Ok(Expr::new(ExprKind::Call { callee: Box::new(callee), paren, arguments }))
	}

	fn primary(&mut self) -> ParseResult<Expr> {
		if self.matches(&[TokenKind::False]) {
			return Ok(Expr::new(ExprKind::Literal(LiteralValue::Bool(false))));
		}
		if self.matches(&[TokenKind::True]) {
			return Ok(Expr::new(ExprKind::Literal(LiteralValue::Bool(true))));
		}
		if self.matches(&[TokenKind::Nil]) {
			return Ok(Expr::new(ExprKind::Literal(LiteralValue::Nil)));
		}
		if self.matches(&[TokenKind::Number]) {
			return Ok(Expr::new(ExprKind::Literal(match self.previous().literal.clone() {
				Some(LiteralPayload::Int(value)) => LiteralValue::Int(value),
				Some(LiteralPayload::Double(value)) => LiteralValue::Double(value),
				_ => unreachable!("a Number token always carries an Int or Double literal"),
			})));
		}
		if self.matches(&[TokenKind::String]) {
			return Ok(Expr::new(ExprKind::Literal(match self.previous().literal.clone() {
				Some(LiteralPayload::Str(value)) => LiteralValue::Str(value),
				_ => unreachable!("a String token always carries a Str literal"),
			})));
		}
		if self.matches(&[TokenKind::This]) {
			return Ok(Expr::new(ExprKind::This { keyword: self.previous().clone() }));
		}
		if self.matches(&[TokenKind::Super]) {
			let keyword = self.previous().clone();
			self.consume(TokenKind::Dot, "Expect '.' after 'super'.")?;
			let method = self.consume(TokenKind::Identifier, "Expect superclass method name.")?.clone();
			return Ok(Expr::new(ExprKind::Super { keyword, method }));
		}
		if self.matches(&[TokenKind::Identifier]) {
			return Ok(Expr::new(ExprKind::Variable { name: self.previous().clone() }));
		}
		if self.matches(&[TokenKind::LeftParen]) {
			let expr = self.expression()?;
			self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
			return Ok(Expr::new(ExprKind::Grouping(Box::new(expr))));
		}

		Err(self.error_at_current("Expect expression."))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lexer::scan;

	fn parse_source(source: &str) -> (Vec<Stmt>, Vec<ParseError>) {
		let (tokens, scan_errors) = scan(source);
		assert!(scan_errors.is_empty());
		parse(tokens)
	}

	#[test]
	fn parses_a_print_statement() {
		let (statements, errors) = parse_source("print 1 + 2;");
		assert!(errors.is_empty());
		assert_eq!(statements.len(), 1);
		assert!(matches!(statements[0], Stmt::Print(_)));
	}

	#[test]
	fn for_loop_desugars_to_block_and_while() {
		let (statements, errors) = parse_source("for (var i = 0; i < 3; i = i + 1) print i;");
		assert!(errors.is_empty());
		let Stmt::Block(outer) = &statements[0] else { panic!("expected desugared block") };
		assert_eq!(outer.len(), 2);
		assert!(matches!(outer[0], Stmt::Var { .. }));
		assert!(matches!(outer[1], Stmt::While { .. }));
	}

	#[test]
	fn invalid_assignment_target_is_reported_but_not_fatal() {
		// A single `1 = 2;` statement can't distinguish "error reported, statement dropped" from
		// "error reported, statement kept" -- both parse to one statement and one error. Pairing it
		// with a second statement on the same run proves parsing didn't abort: if the bad target
		// had propagated through `synchronize()`, it would have eaten the `print "after";` too.
		let (statements, errors) = parse_source("1 = 2; print \"after\";");
		assert_eq!(errors.len(), 1);
		assert!(errors[0].message.contains("Invalid assignment target"));
		assert_eq!(statements.len(), 2);
		assert!(matches!(statements[0], Stmt::Expression(_)));
		assert!(matches!(statements[1], Stmt::Print(_)));
	}

	#[test]
	fn invalid_assignment_target_inside_a_call_still_parses_the_rest_of_it() {
		// The invalid target is just one argument expression; the call around it is unaffected.
		let (statements, errors) = parse_source("foo(1 = 2, bar);");
		assert_eq!(errors.len(), 1);
		assert!(errors[0].message.contains("Invalid assignment target"));
		assert_eq!(statements.len(), 1);
		let Stmt::Expression(expr) = &statements[0] else { panic!("expected an expression statement") };
		let ExprKind::Call { arguments, .. } = &expr.kind else { panic!("expected a call expression") };
		assert_eq!(arguments.len(), 2);
	}

	#[test]
	fn missing_semicolon_is_a_parse_error() {
		let (_, errors) = parse_source("var x = 1");
		assert_eq!(errors.len(), 1);
	}

	#[test]
	fn synchronize_recovers_to_the_next_statement() {
		let (statements, errors) = parse_source("var = 1; print 2;");
		assert_eq!(errors.len(), 1);
		assert_eq!(statements.len(), 1);
		assert!(matches!(statements[0], Stmt::Print(_)));
	}

	#[test]
	fn class_with_superclass_parses() {
		let (statements, errors) = parse_source("class B < A { greet() { return nil; } }");
		assert!(errors.is_empty());
		let Stmt::Class { superclass, methods, .. } = &statements[0] else { panic!("expected class") };
		assert!(superclass.is_some());
		assert_eq!(methods.len(), 1);
	}
}
