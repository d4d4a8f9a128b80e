//! The abstract syntax tree. Two disjoint closed enums, `Expr` and `Stmt`, produced once by the
//! parser and never mutated afterwards. Dispatch over them is exhaustive pattern matching rather
//! than a visitor hierarchy -- there is no inheritance to model, so a tagged union is the natural
//! fit for a systems language.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::token::Token;

/// A process-unique identity for an expression node, distinct from structural equality. The
/// resolver keys its scope-distance side table by `ExprId`, never by the shape of the expression,
/// so two syntactically identical `Variable` references at different call sites never collide.
///
/// Minted once, at parse time, by a monotonic counter. Never recomputed, never deduplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(u32);

static NEXT_EXPR_ID: AtomicU32 = AtomicU32::new(0);

impl ExprId {
	fn fresh() -> Self {
		Self(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
	}
}

/// One of the literal value shapes that can appear directly in source (`Expr::Literal`).
#[derive(Debug, Clone)]
pub enum LiteralValue {
	Nil,
	Bool(bool),
	Int(i64),
	Double(f64),
	Str(String),
}

/// A binary arithmetic/comparison operator, alongside the token it came from (for line info in
/// runtime-error reporting).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
	Add,
	Subtract,
	Multiply,
	Divide,
	Greater,
	GreaterEqual,
	Less,
	LessEqual,
	Equal,
	NotEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
	And,
	Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
	Negate,
	Not,
}

/// An expression node. Every variant is wrapped with its `ExprId` by the `Expr` struct below
/// rather than carrying it as a per-variant field, so constructing one never forgets to mint it.
#[derive(Debug, Clone)]
pub struct Expr {
	pub id: ExprId,
	pub kind: ExprKind,
}

impl Expr {
	#[must_use]
	pub fn new(kind: ExprKind) -> Self {
		Self { id: ExprId::fresh(), kind }
	}
}

#[derive(Debug, Clone)]
pub enum ExprKind {
	Literal(LiteralValue),
	Grouping(Box<Expr>),
	Unary { op: UnaryOp, op_token: Token, operand: Box<Expr> },
	Binary { left: Box<Expr>, op: BinaryOp, op_token: Token, right: Box<Expr> },
	Logical { left: Box<Expr>, op: LogicalOp, right: Box<Expr> },
	Variable { name: Token },
	Assign { name: Token, value: Box<Expr> },
	Call { callee: Box<Expr>, paren: Token, arguments: Vec<Expr> },
	Get { object: Box<Expr>, name: Token },
	Set { object: Box<Expr>, name: Token, value: Box<Expr> },
	This { keyword: Token },
	Super { keyword: Token, method: Token },
}

/// A function declaration's shared shape: used both for top-level `fun` statements and for
/// methods inside a `class` body, which parse identically (spec grammar: `function`).
#[derive(Debug, Clone)]
pub struct FunctionDecl {
	pub name: Token,
	pub params: Vec<Token>,
	pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
	Expression(Expr),
	Print(Expr),
	Var { name: Token, initializer: Option<Expr> },
	Block(Vec<Stmt>),
	If { condition: Expr, then_branch: Box<Stmt>, else_branch: Option<Box<Stmt>> },
	While { condition: Expr, body: Box<Stmt> },
	Function(FunctionDecl),
	Return { keyword: Token, value: Option<Expr> },
	Class { name: Token, superclass: Option<Expr>, methods: Vec<FunctionDecl> },
}
