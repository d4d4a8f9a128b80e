//! The `plox` binary entry point. All of the actual work lives in the library crate; this just
//! runs the CLI driver and forwards its exit code to the OS.

use std::process::ExitCode;

fn main() -> ExitCode {
	plox::cli::run()
}
