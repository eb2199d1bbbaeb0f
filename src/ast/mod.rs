//! AST node definitions for Monkey.

pub mod expr;
pub mod stmt;

pub use self::expr::{Expr, ExprKind, InfixOp, PrefixOp};
pub use self::stmt::{BlockStatement, Program, Stmt, StmtKind};
