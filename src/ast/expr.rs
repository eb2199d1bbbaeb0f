//! Expression AST nodes.

use std::fmt;

use crate::ast::stmt::BlockStatement;
use crate::span::Span;

/// An expression in the AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// All expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Integer literal: 42
    IntegerLiteral(i64),
    /// String literal: "hello"
    StringLiteral(String),
    /// Boolean literal: true, false
    BooleanLiteral(bool),
    /// Null literal
    NullLiteral,

    /// Variable reference: foo
    Identifier(String),

    /// Prefix operation: -x, !x
    Prefix { operator: PrefixOp, right: Box<Expr> },

    /// Infix operation: a + b
    Infix {
        left: Box<Expr>,
        operator: InfixOp,
        right: Box<Expr>,
    },

    /// Conditional expression: if (cond) { ... } else { ... }
    If {
        condition: Box<Expr>,
        consequence: BlockStatement,
        alternative: Option<BlockStatement>,
    },

    /// Array literal: [1, 2, 3]
    Array(Vec<Expr>),

    /// Hash literal: { "key": "value", ... }
    Hash(Vec<(Expr, Expr)>),

    /// Index expression: coll[index]
    Index { left: Box<Expr>, index: Box<Expr> },
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Negate,
    Not,
}

impl fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixOp::Negate => write!(f, "-"),
            PrefixOp::Not => write!(f, "!"),
        }
    }
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfixOp::Add => write!(f, "+"),
            InfixOp::Subtract => write!(f, "-"),
            InfixOp::Multiply => write!(f, "*"),
            InfixOp::Divide => write!(f, "/"),
            InfixOp::Less => write!(f, "<"),
            InfixOp::LessEqual => write!(f, "<="),
            InfixOp::Greater => write!(f, ">"),
            InfixOp::GreaterEqual => write!(f, ">="),
            InfixOp::Equal => write!(f, "=="),
            InfixOp::NotEqual => write!(f, "!="),
        }
    }
}

impl fmt::Display for Expr {
    /// Format an expression back into Monkey surface syntax. Prefix and
    /// infix expressions are parenthesized, which makes the printed form
    /// unambiguous; the compiler relies on this for deterministic hash
    /// literal emission.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::IntegerLiteral(n) => write!(f, "{}", n),
            ExprKind::StringLiteral(s) => write!(f, "{}", s),
            ExprKind::BooleanLiteral(b) => write!(f, "{}", b),
            ExprKind::NullLiteral => write!(f, "null"),
            ExprKind::Identifier(name) => write!(f, "{}", name),
            ExprKind::Prefix { operator, right } => write!(f, "({}{})", operator, right),
            ExprKind::Infix {
                left,
                operator,
                right,
            } => write!(f, "({} {} {})", left, operator, right),
            ExprKind::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if {} {}", condition, consequence)?;
                if let Some(alternative) = alternative {
                    write!(f, " else {}", alternative)?;
                }
                Ok(())
            }
            ExprKind::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            ExprKind::Hash(pairs) => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            ExprKind::Index { left, index } => write!(f, "({}[{}])", left, index),
        }
    }
}
