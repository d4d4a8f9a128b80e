//! Lexical environments. Each block, function call, and the top-level program gets its own
//! `Environment` frame, parent-linked back toward the global frame. Frames are shared via
//! `Rc<RefCell<_>>` rather than owned outright, because closures must be able to keep a frame
//! alive (and keep observing mutations to it) long after the block that created it has returned.
//!
//! Lookups come in two flavors: `get`/`assign` walk the parent chain outward until a binding is
//! found (used for globals and anything the resolver couldn't statically locate), while
//! `get_at`/`assign_at` jump directly to a known ancestor by hop count, the distance the resolver
//! computed ahead of time. The exact-hop form is what makes closures and shadowing behave
//! correctly: it binds a reference to the scope that existed when the expression was resolved,
//! not whatever scope happens to be live when it runs.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::value::Value;

#[derive(Debug)]
pub struct Environment {
	values: RefCell<HashMap<String, Value>>,
	enclosing: Option<Rc<Environment>>,
}

pub type EnvRef = Rc<Environment>;

impl Environment {
	/// Builds the outermost, parent-less frame. The interpreter seeds this with native
	/// functions (`clock`) once at startup.
	#[must_use]
	pub fn global() -> EnvRef {
		Rc::new(Self { values: RefCell::new(HashMap::new()), enclosing: None })
	}

	/// Builds a new frame nested directly inside `enclosing`.
	#[must_use]
	pub fn child(enclosing: &EnvRef) -> EnvRef {
		Rc::new(Self { values: RefCell::new(HashMap::new()), enclosing: Some(Rc::clone(enclosing)) })
	}

	/// Introduces a new binding in this frame, or overwrites one already here. Unlike `assign`,
	/// this never looks outward -- redeclaring `x` in the same block is legal Lox and simply
	/// shadows whatever was there before.
	pub fn define(&self, name: impl Into<String>, value: Value) {
		self.values.borrow_mut().insert(name.into(), value);
	}

	pub fn get(&self, name: &str, line: usize) -> Result<Value, RuntimeError> {
		if let Some(value) = self.values.borrow().get(name) {
			return Ok(value.clone());
		}
		if let Some(enclosing) = &self.enclosing {
			return enclosing.get(name, line);
		}
		Err(RuntimeError::UndefinedVariable { line, name: name.to_owned() })
	}

	pub fn assign(&self, name: &str, value: Value, line: usize) -> Result<(), RuntimeError> {
		if self.values.borrow().contains_key(name) {
			self.values.borrow_mut().insert(name.to_owned(), value);
			return Ok(());
		}
		if let Some(enclosing) = &self.enclosing {
			return enclosing.assign(name, value, line);
		}
		Err(RuntimeError::UndefinedVariable { line, name: name.to_owned() })
	}

	fn ancestor(self: &Rc<Self>, distance: usize) -> Rc<Self> {
		let mut env = Rc::clone(self);
		for _ in 0..distance {
			env = Rc::clone(env.enclosing.as_ref().expect("resolver-computed distance must stay within the environment chain"));
		}
		env
	}

	/// Reads a binding known to live exactly `distance` hops out, as computed by the resolver.
	/// Panics (via `expect`) if the chain is shorter than `distance` or the name is missing there
	/// -- both indicate the resolver and the environment chain have gone out of sync, which is a
	/// bug in this interpreter, not a user-facing error condition.
	pub fn get_at(self: &Rc<Self>, distance: usize, name: &str) -> Value {
		self.ancestor(distance)
			.values
			.borrow()
			.get(name)
			.cloned()
			.unwrap_or_else(|| panic!("resolver distance {distance} for '{name}' did not resolve to a binding"))
	}

	pub fn assign_at(self: &Rc<Self>, distance: usize, name: &str, value: Value) {
		self.ancestor(distance).values.borrow_mut().insert(name.to_owned(), value);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn shadowing_in_a_child_scope_does_not_touch_the_parent() {
		let global = Environment::global();
		global.define("x", Value::Int(1));

		let child = Environment::child(&global);
		child.define("x", Value::Int(2));

		assert_eq!(child.get("x", 1).unwrap(), Value::Int(2));
		assert_eq!(global.get("x", 1).unwrap(), Value::Int(1));
	}

	#[test]
	fn assign_walks_outward_to_find_the_binding() {
		let global = Environment::global();
		global.define("x", Value::Int(1));
		let child = Environment::child(&global);

		child.assign("x", Value::Int(9), 1).unwrap();

		assert_eq!(global.get("x", 1).unwrap(), Value::Int(9));
	}

	#[test]
	fn undefined_variable_is_a_runtime_error() {
		let global = Environment::global();
		assert!(matches!(global.get("missing", 3), Err(RuntimeError::UndefinedVariable { line: 3, .. })));
	}

	#[test]
	fn get_at_jumps_directly_to_the_ancestor() {
		let global = Environment::global();
		global.define("x", Value::Int(1));
		let child = Environment::child(&global);
		child.define("x", Value::Int(2));
		let grandchild = Environment::child(&child);

		assert_eq!(grandchild.get_at(1, "x"), Value::Int(2));
		assert_eq!(grandchild.get_at(2, "x"), Value::Int(1));
	}
}
