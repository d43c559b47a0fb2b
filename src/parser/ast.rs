use crate::common::span::Span;

/// A binary operator tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

/// A unary operator tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Negate,
    Not,
}

/// An expression node. Carries no span of its own — statements that
/// need one for diagnostics keep it alongside the expression instead,
/// since the compiler only ever needs a span at the statement it's
/// currently emitting.
#[derive(Debug, Clone)]
pub enum Expr {
    Identifier(String),
    StringLiteral(String),
    IntLiteral(i64),
    FloatLiteral(f64),
    Unary { op: UnOp, operand: Box<Expr> },
    Binary { op: BinOp, left: Box<Expr>, right: Box<Expr> },
    MemberAccess { object: Box<Expr>, member: String },
    Call { callee: Box<Expr>, args: Vec<Expr> },
}

/// A statement node.
#[derive(Debug, Clone)]
pub enum Stmt {
    Import { module: String, span: Span },
    Let { name: String, init: Expr, span: Span },
    Assignment { name: String, value: Expr, span: Span },
    If { condition: Expr, then_branch: Box<Stmt>, else_branch: Option<Box<Stmt>>, span: Span },
    While { condition: Expr, body: Box<Stmt>, span: Span },
    Loop { body: Box<Stmt>, span: Span },
    Break(Span),
    Continue(Span),
    Block(Vec<Stmt>),
    /// An expression used as a statement — only a `call` shape actually
    /// compiles to anything; see `Compiler::expression_statement`.
    Expr(Expr, Span),
}

/// The root of the tree: an ordered sequence of statements. Dropping the
/// `Program` drops the whole tree, since every child is owned by its
/// parent via ordinary `Vec`/`Box` ownership.
#[derive(Debug, Clone)]
pub struct Program {
    pub statements: Vec<Stmt>,
}
