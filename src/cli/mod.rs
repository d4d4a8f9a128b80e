//! The command-line driver: argument parsing, the file-running path, and the REPL. This is the
//! only module that knows about `std::process::exit` codes or talks to `std::io::stdin` --
//! everything below it (scanner, parser, resolver, interpreter) is a plain library that knows
//! nothing about processes or terminals.

use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as _;
use colored::Colorize as _;
use log::debug;

/// A tree-walking interpreter for Lox.
///
/// Run with a script path to execute a file, or with no arguments to start an interactive
/// session (REPL).
#[derive(clap::Parser)]
#[command(version, about)]
struct Args {
	/// Path to a `.lox` script to run. Omit to start the REPL instead.
	script: Option<PathBuf>,

	/// Extra positional arguments, accepted only so we can report the spec's own "Usage:"
	/// error for them instead of letting clap reject them with a different message.
	#[arg(hide = true, trailing_var_arg = true)]
	extra: Vec<String>,
}

/// Parses arguments and runs either the file path or the REPL. Returns the process exit code:
/// `0` on success, `1` if the program had a static (scan/parse/resolve) error or was given a bad
/// usage, `2` for a runtime error.
#[must_use]
pub fn run() -> ExitCode {
	env_logger::init();

	let args = Args::parse();

	if !args.extra.is_empty() {
		eprintln!("Usage: plox [script]");
		return ExitCode::from(1);
	}

	match args.script {
		Some(path) => run_file(&path),
		None => run_repl(),
	}
}

fn run_file(path: &PathBuf) -> ExitCode {
	let source = match std::fs::read_to_string(path) {
		Ok(source) => source,
		Err(error) => {
			println!("Could not read file '{}': {error}", path.display());
			return ExitCode::from(2);
		},
	};

	debug!("running {} ({} bytes)", path.display(), source.len());

	match crate::run(&source) {
		crate::Outcome::Ok => ExitCode::SUCCESS,
		crate::Outcome::StaticError => ExitCode::from(1),
		crate::Outcome::RuntimeError => ExitCode::from(2),
	}
}

fn run_repl() -> ExitCode {
	println!("{}", "plox REPL -- press Ctrl+D to exit".dimmed());

	let mut line = String::new();
	loop {
		print!("> ");
		if std::io::stdout().flush().is_err() {
			return ExitCode::from(2);
		}

		line.clear();
		let bytes_read = std::io::stdin().read_line(&mut line);
		match bytes_read {
			Ok(0) => {
				println!();
				return ExitCode::SUCCESS;
			},
			Ok(_) => {
				// A static error in one REPL line doesn't end the session -- only file runs treat
				// it as fatal for the whole process.
				crate::run(&line);
			},
			Err(error) => {
				println!("Could not read input: {error}");
				return ExitCode::from(2);
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn usage_error_path_is_well_formed() {
		// `extra` arguments should route to the usage-error branch; this just documents the
		// invariant rather than exercising the process exit path.
		let args = Args { script: None, extra: vec!["a".to_owned(), "b".to_owned()] };
		assert!(!args.extra.is_empty());
	}
}
