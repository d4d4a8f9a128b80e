//! Diagnostics. Every phase of the pipeline (scan, parse, resolve, evaluate) reports failures
//! through one of the small error structs here, each carrying the `line` it occurred on so the
//! driver can print a uniform, line-annotated message (see `Display` impls below and §7 of the
//! spec this interpreter implements).
//!
//! Static errors (scan/parse/resolve) and the single runtime error type are intentionally
//! separate types: the driver collects *all* static errors it can find in one pass, but stops at
//! the first runtime error, and the two phases report in different wire formats.

use std::fmt;

use colored::Colorize as _;

use crate::token::{Token, TokenKind};

/// Where, syntactically, a parse error occurred -- used to render the `<where>` clause of the
/// static error format (`" at end"`, `" at '<lexeme>'"`, or nothing for scan errors).
#[derive(Debug, Clone)]
pub enum ErrorLocation {
	/// No location information (used by scan errors, which occur before tokens exist).
	None,
	AtEnd,
	AtLexeme(String),
}

impl ErrorLocation {
	#[must_use]
	pub fn of_token(token: &Token) -> Self {
		if token.kind == TokenKind::Eof {
			Self::AtEnd
		} else {
			Self::AtLexeme(token.lexeme.clone())
		}
	}
}

#[derive(Debug, Clone)]
pub struct ScanError {
	pub line: usize,
	pub message: String,
}

#[derive(Debug, Clone)]
pub struct ParseError {
	pub line: usize,
	pub where_: ErrorLocation,
	pub message: String,
}

#[derive(Debug, Clone)]
pub struct ResolveError {
	pub line: usize,
	pub where_: ErrorLocation,
	pub message: String,
}

/// The runtime error taxonomy (spec §7). Every variant carries the line of the nearest relevant
/// token, which the driver prints alongside the message.
#[derive(Debug, Clone)]
pub enum RuntimeError {
	OperandMustBeNumber { line: usize },
	OperandsMustBeNumbers { line: usize },
	OperandsMustBeNumbersOrStrings { line: usize },
	DivisionByZero { line: usize },
	UndefinedVariable { line: usize, name: String },
	UndefinedProperty { line: usize, name: String },
	NotCallable { line: usize },
	ArityMismatch { line: usize, expected: usize, actual: usize },
	PropertyAccessOnNonInstance { line: usize },
	SuperclassMustBeClass { line: usize },
}

impl RuntimeError {
	#[must_use]
	pub const fn line(&self) -> usize {
		match self {
			Self::OperandMustBeNumber { line }
			| Self::OperandsMustBeNumbers { line }
			| Self::OperandsMustBeNumbersOrStrings { line }
			| Self::DivisionByZero { line }
			| Self::UndefinedVariable { line, .. }
			| Self::UndefinedProperty { line, .. }
			| Self::NotCallable { line }
			| Self::ArityMismatch { line, .. }
			| Self::PropertyAccessOnNonInstance { line }
			| Self::SuperclassMustBeClass { line } => *line,
		}
	}

	#[must_use]
	pub fn message(&self) -> String {
		match self {
			Self::OperandMustBeNumber { .. } => "Operand must be a number.".to_owned(),
			Self::OperandsMustBeNumbers { .. } => "Operands must be numbers.".to_owned(),
			Self::OperandsMustBeNumbersOrStrings { .. } => "Operands must be two numbers or two strings.".to_owned(),
			Self::DivisionByZero { .. } => "Division by zero.".to_owned(),
			Self::UndefinedVariable { name, .. } => format!("Undefined variable '{name}'."),
			Self::UndefinedProperty { name, .. } => format!("Undefined property '{name}'."),
			Self::NotCallable { .. } => "Can only call functions and classes.".to_owned(),
			Self::ArityMismatch { expected, actual, .. } => format!("Expected {expected} arguments but got {actual}."),
			Self::PropertyAccessOnNonInstance { .. } => "Only instances have properties.".to_owned(),
			Self::SuperclassMustBeClass { .. } => "Superclass must be a class.".to_owned(),
		}
	}
}

impl fmt::Display for ScanError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[line {}] Error: {}", self.line, self.message)
	}
}

fn fmt_static(f: &mut fmt::Formatter<'_>, line: usize, where_: &ErrorLocation, message: &str) -> fmt::Result {
	let where_clause = match where_ {
		ErrorLocation::None => String::new(),
		ErrorLocation::AtEnd => " at end".to_owned(),
		ErrorLocation::AtLexeme(lexeme) => format!(" at '{lexeme}'"),
	};
	write!(f, "[line {line}] Error{where_clause}: {message}")
}

impl fmt::Display for ParseError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt_static(f, self.line, &self.where_, &self.message)
	}
}

impl fmt::Display for ResolveError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt_static(f, self.line, &self.where_, &self.message)
	}
}

impl fmt::Display for RuntimeError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}\n[line {}]", self.message(), self.line())
	}
}

impl std::error::Error for ScanError {}
impl std::error::Error for ParseError {}
impl std::error::Error for ResolveError {}
impl std::error::Error for RuntimeError {}

/// Prints a static diagnostic in the uniform colored form used across scan/parse/resolve errors.
/// This is purely presentational -- the `Display` impls above define the normative plain-text
/// wire format; this adds color for a TTY (and degrades automatically when `NO_COLOR` is set or
/// output isn't a terminal, per the `colored` crate's own convention).
///
/// Diagnostics are written to standard output, not standard error -- this interpreter's contract
/// (§6/§7 of the spec) treats them as part of the program's normal output stream.
pub fn report_static(error: &impl fmt::Display) {
	println!("{}", error.to_string().red().bold());
}

/// Prints a runtime diagnostic in the uniform colored form.
pub fn report_runtime(error: &RuntimeError) {
	println!("{}", error.to_string().red().bold());
}
