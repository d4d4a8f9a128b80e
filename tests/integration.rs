//! Black-box tests: each one runs the actual `plox` binary against a fixture script and checks
//! its stdout and exit code, the same way a user would invoke it from a shell. Unlike the
//! colocated unit tests in each module, these exercise the full CLI -- argument parsing, file
//! reading, and process exit codes included.

use std::path::Path;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;

fn run_fixture(name: &str) -> Output {
	let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
	Command::new(env!("CARGO_BIN_EXE_plox")).arg(fixture).env("NO_COLOR", "1").output().expect("failed to run the plox binary")
}

fn stdout(output: &Output) -> String {
	String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
	String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn closures_capture_independent_counter_state() {
	let output = run_fixture("closures.lox");
	assert_eq!(stdout(&output), "1\n2\n3\n");
	assert!(output.status.success());
}

#[test]
fn inheritance_and_super_calls_compose() {
	let output = run_fixture("classes_and_inheritance.lox");
	assert_eq!(stdout(&output), "Rex makes a sound. Specifically, a bark.\nRex\n");
	assert!(output.status.success());
}

#[test]
fn for_and_while_loops_run_their_bodies_in_order() {
	let output = run_fixture("control_flow.lox");
	assert_eq!(stdout(&output), "0\none\n2\n0\n1\n");
	assert!(output.status.success());
}

#[test]
fn division_by_zero_stops_the_program_with_exit_code_two() {
	let output = run_fixture("runtime_error_division_by_zero.lox");
	assert_eq!(stdout(&output), "before\nDivision by zero.\n[line 2]\n");
	assert_eq!(output.status.code(), Some(2));
}

#[test]
fn an_invalid_assignment_target_is_a_static_error_with_exit_code_one() {
	let output = run_fixture("static_error_undefined_target.lox");
	let text = stdout(&output);
	assert!(text.contains("Invalid assignment target"), "{text}");
	assert_eq!(output.status.code(), Some(1));
}

#[test]
fn a_missing_script_file_exits_with_code_two() {
	let output = Command::new(env!("CARGO_BIN_EXE_plox")).arg("does-not-exist.lox").output().expect("failed to run the plox binary");
	assert_eq!(output.status.code(), Some(2));
}

#[test]
fn more_than_one_argument_prints_usage_to_stderr_and_exits_with_code_one() {
	let output = Command::new(env!("CARGO_BIN_EXE_plox"))
		.args(["one.lox", "two.lox"])
		.output()
		.expect("failed to run the plox binary");
	assert_eq!(stdout(&output), "");
	assert!(stderr(&output).contains("Usage: plox"), "{}", stderr(&output));
	assert_eq!(output.status.code(), Some(1));
}
