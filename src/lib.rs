//! # plox
//!
//! A tree-walking interpreter for Lox, a small dynamically typed scripting language: closures,
//! single-inheritance classes, and C-like control flow, evaluated directly over its syntax tree
//! rather than compiled to bytecode.
//!
//! The pipeline is four stages, each its own module: [`lexer`] turns source text into tokens,
//! [`parser`] turns tokens into an AST ([`ast`]), [`resolver`] walks the AST once to statically
//! compute lexical scope distances, and [`interpreter`] walks it again to actually run the
//! program. [`run`] wires all four together; the [`cli`] module is the thin process-level shell
//! around it.

/// The abstract syntax tree produced by the parser.
pub mod ast;

/// Dispatch shared by user-defined functions, classes, and native functions.
pub mod callable;

/// The command-line driver: argument parsing, file execution, and the REPL.
pub mod cli;

/// Lexical scope frames used by the interpreter.
pub mod environment;

/// Diagnostics shared by every pipeline stage.
pub mod error;

/// The tree-walking evaluator.
pub mod interpreter;

/// The scanner, turning source text into a token stream.
pub mod lexer;

/// The recursive-descent parser.
pub mod parser;

/// The static scope-resolution pass between parsing and evaluation.
pub mod resolver;

/// The token model shared by the scanner and parser.
pub mod token;

/// Runtime values produced and consumed by the interpreter.
pub mod value;

use error::{report_runtime, report_static};
use interpreter::Interpreter;

/// How a single run of the pipeline ended. Distinct from a `Result` because there are three
/// buckets to distinguish, not two, and none of them carry a Rust error value -- each stage
/// prints its own diagnostics directly (to standard output, per this interpreter's error-reporting
/// contract) and this only reports which bucket execution landed in, for the CLI to translate into
/// a process exit code.
pub enum Outcome {
	Ok,
	StaticError,
	RuntimeError,
}

/// Runs one program end to end: scan, parse, resolve, then evaluate, stopping at the first stage
/// that reports an error. Used by both the file-running path and each line of the REPL.
#[must_use]
pub fn run(source: &str) -> Outcome {
	let (tokens, scan_errors) = lexer::scan(source);
	for error in &scan_errors {
		report_static(error);
	}

	let (statements, parse_errors) = parser::parse(tokens);
	for error in &parse_errors {
		report_static(error);
	}

	if !scan_errors.is_empty() || !parse_errors.is_empty() {
		return Outcome::StaticError;
	}

	let (locals, resolve_errors) = resolver::resolve(&statements);
	for error in &resolve_errors {
		report_static(error);
	}
	if !resolve_errors.is_empty() {
		return Outcome::StaticError;
	}

	match Interpreter::new(locals).interpret(&statements) {
		Ok(()) => Outcome::Ok,
		Err(error) => {
			report_runtime(&error);
			Outcome::RuntimeError
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn a_clean_program_reports_ok() {
		assert!(matches!(run("print 1 + 1;"), Outcome::Ok));
	}

	#[test]
	fn a_scan_error_is_reported_as_static() {
		assert!(matches!(run("@"), Outcome::StaticError));
	}

	#[test]
	fn a_runtime_error_is_reported_as_runtime() {
		assert!(matches!(run("print 1 / 0;"), Outcome::RuntimeError));
	}
}
