//! Runtime values. A closed enum rather than a trait-object soup: every Lox value fits one of
//! these seven shapes, and the interpreter dispatches over them with ordinary pattern matching.
//!
//! Numbers are deliberately split into `Int`/`Double` rather than collapsed into one `f64`, so
//! that e.g. `1 + 1` prints `2`, not `2.0` -- see the arithmetic rules in `crate::interpreter`
//! for exactly when an operation promotes an `Int` to a `Double`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::callable::{Callable, NativeFunction};
use crate::environment::{EnvRef, Environment};
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;

#[derive(Debug, Clone)]
pub enum Value {
	Nil,
	Bool(bool),
	Int(i64),
	Double(f64),
	Str(String),
	Function(Rc<LoxFunction>),
	NativeFunction(Rc<NativeFunction>),
	Class(Rc<LoxClass>),
	Instance(Rc<LoxInstance>),
}

impl Value {
	/// Lox's truthiness rule: everything is truthy except `nil` and `false`. In particular `0`
	/// and `""` are truthy, unlike some scripting languages.
	#[must_use]
	pub fn is_truthy(&self) -> bool {
		!matches!(self, Self::Nil | Self::Bool(false))
	}

	#[must_use]
	pub fn type_name(&self) -> &'static str {
		match self {
			Self::Nil => "nil",
			Self::Bool(_) => "boolean",
			Self::Int(_) | Self::Double(_) => "number",
			Self::Str(_) => "string",
			Self::Function(_) | Self::NativeFunction(_) => "function",
			Self::Class(_) => "class",
			Self::Instance(_) => "instance",
		}
	}

	/// Returns the `Rc<dyn Callable>`-equivalent view of this value if it can be called, without
	/// allocating a trait object: the interpreter matches on this to route a `Call` expression to
	/// the right concrete implementation.
	#[must_use]
	pub fn as_callable(&self) -> Option<&dyn Callable> {
		match self {
			Self::Function(f) => Some(f.as_ref() as &dyn Callable),
			Self::NativeFunction(f) => Some(f.as_ref() as &dyn Callable),
			Self::Class(c) => Some(c.as_ref() as &dyn Callable),
			_ => None,
		}
	}
}

impl PartialEq for Value {
	/// Lox equality: same variant and same value, with no implicit numeric coercion (an `Int`
	/// and a `Double` that happen to represent the same number are still unequal, matching the
	/// "compare by kind first" idiom the rest of this module follows). Callables and instances
	/// compare by identity (pointer equality of the shared `Rc`), never structurally.
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Nil, Self::Nil) => true,
			(Self::Bool(a), Self::Bool(b)) => a == b,
			(Self::Int(a), Self::Int(b)) => a == b,
			(Self::Double(a), Self::Double(b)) => a == b,
			(Self::Str(a), Self::Str(b)) => a == b,
			(Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
			(Self::NativeFunction(a), Self::NativeFunction(b)) => Rc::ptr_eq(a, b),
			(Self::Class(a), Self::Class(b)) => Rc::ptr_eq(a, b),
			(Self::Instance(a), Self::Instance(b)) => Rc::ptr_eq(a, b),
			_ => false,
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Nil => write!(f, "nil"),
			Self::Bool(value) => write!(f, "{value}"),
			Self::Int(value) => write!(f, "{value}"),
			Self::Double(value) => write!(f, "{}", format_double(*value)),
			Self::Str(value) => write!(f, "{value}"),
			Self::Function(function) => write!(f, "<fn {}>", function.declaration.name.lexeme),
			Self::NativeFunction(function) => write!(f, "<native fn {}>", function.callable_name()),
			Self::Class(class) => write!(f, "{}", class.name),
			Self::Instance(instance) => write!(f, "{} instance", instance.class.name),
		}
	}
}

/// Rust's own `f64` `Display` drops the fractional part entirely for a whole-number double
/// (`3.0_f64` prints as `"3"`), which would make it indistinguishable from an `Int`. Lox numbers
/// need that distinction to stay visible, so a double that happens to be integral keeps its `.0`.
fn format_double(value: f64) -> String {
	if value.is_finite() && value.fract() == 0.0 {
		format!("{value:.1}")
	} else {
		value.to_string()
	}
}

/// A user-defined function or method, paired with the environment that was active where it was
/// declared. That captured environment is what makes closures work: calling the function later
/// creates a fresh frame whose parent is this one, not whatever frame happens to be on top of the
/// call stack at the call site.
#[derive(Debug)]
pub struct LoxFunction {
	pub declaration: Rc<FunctionDecl>,
	closure: EnvRef,
	is_initializer: bool,
}

impl LoxFunction {
	#[must_use]
	pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
		Self { declaration, closure, is_initializer }
	}

	/// Produces a copy of this method bound to `instance`: a new environment, parented at the
	/// method's original closure, with `this` defined in it. Rebinding happens once per
	/// `instance.method` lookup rather than once per class, since each instance needs its own
	/// `this`.
	#[must_use]
	pub fn bind(&self, instance: Rc<LoxInstance>) -> Self {
		let environment = Environment::child(&self.closure);
		environment.define("this", Value::Instance(instance));
		Self { declaration: Rc::clone(&self.declaration), closure: environment, is_initializer: self.is_initializer }
	}
}

impl Callable for LoxFunction {
	fn arity(&self) -> usize {
		self.declaration.params.len()
	}

	fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
		let call_environment = Environment::child(&self.closure);
		for (param, argument) in self.declaration.params.iter().zip(arguments) {
			call_environment.define(param.lexeme.clone(), argument);
		}

		let signal = interpreter.execute_block(&self.declaration.body, call_environment)?;

		// `init()` always returns the instance being constructed, even given a bare `return;`.
		if self.is_initializer {
			return Ok(self.closure.get_at(0, "this"));
		}

		match signal {
			crate::interpreter::Signal::Return(value) => Ok(value),
			crate::interpreter::Signal::Normal => Ok(Value::Nil),
		}
	}

	fn callable_name(&self) -> &str {
		&self.declaration.name.lexeme
	}
}

/// A class, as a first-class value. Calling a class (it implements `Callable`) constructs a new
/// instance and runs `init` if the class or one of its ancestors defines one.
#[derive(Debug, Clone)]
pub struct LoxClass {
	pub name: String,
	pub superclass: Option<Rc<LoxClass>>,
	methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
	#[must_use]
	pub fn new(name: String, superclass: Option<Rc<LoxClass>>, methods: HashMap<String, Rc<LoxFunction>>) -> Self {
		Self { name, superclass, methods }
	}

	/// Looks up a method by name, walking up the single-inheritance chain toward the root class
	/// if this class doesn't define it directly.
	#[must_use]
	pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
		if let Some(method) = self.methods.get(name) {
			return Some(Rc::clone(method));
		}
		self.superclass.as_ref().and_then(|superclass| superclass.find_method(name))
	}
}

impl Callable for LoxClass {
	fn arity(&self) -> usize {
		self.find_method("init").map_or(0, |initializer| initializer.arity())
	}

	fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
		// `&self` alone can't hand the new instance a shared `Rc<LoxClass>`, so we mint a fresh
		// one here. Cloning is shallow (the superclass link and method table are `Rc`s already),
		// so this costs one new allocation, not a deep copy of the class's methods.
		interpreter.instantiate(Rc::new(self.clone()), arguments)
	}

	fn callable_name(&self) -> &str {
		&self.name
	}
}

/// A runtime object: a class plus its own mutable bag of fields. Fields are entirely dynamic --
/// there is no declared-field list on `LoxClass` -- so `fields` starts empty and grows as the
/// object is assigned to.
#[derive(Debug)]
pub struct LoxInstance {
	pub class: Rc<LoxClass>,
	fields: RefCell<HashMap<String, Value>>,
}

impl LoxInstance {
	#[must_use]
	pub fn new(class: Rc<LoxClass>) -> Self {
		Self { class, fields: RefCell::new(HashMap::new()) }
	}

	pub fn set(&self, name: impl Into<String>, value: Value) {
		self.fields.borrow_mut().insert(name.into(), value);
	}

	#[must_use]
	pub fn field(&self, name: &str) -> Option<Value> {
		self.fields.borrow().get(name).cloned()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn integral_doubles_keep_their_decimal_point() {
		assert_eq!(Value::Double(3.0).to_string(), "3.0");
		assert_eq!(Value::Double(-2.0).to_string(), "-2.0");
	}

	#[test]
	fn non_integral_doubles_print_normally() {
		assert_eq!(Value::Double(1.5).to_string(), "1.5");
	}

	#[test]
	fn ints_never_gain_a_decimal_point() {
		assert_eq!(Value::Int(3).to_string(), "3");
	}
}
