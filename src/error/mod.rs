//! Error types for every phase of the pipeline.
//!
//! Compile-time and run-time failures use separate taxonomies and are never
//! mixed: the compiler reports `CompileError`, the virtual machine reports
//! `RuntimeError`. Neither recovers locally; errors propagate to the driver,
//! which prints them (REPL) or exits non-zero (batch).

use crate::span::Span;
use thiserror::Error;

/// Lexer errors.
#[derive(Debug, Error)]
pub enum LexerError {
    #[error("unexpected character '{0}' at {1}")]
    UnexpectedChar(char, Span),

    #[error("unterminated string at {0}")]
    UnterminatedString(Span),

    #[error("invalid escape sequence '\\{0}' at {1}")]
    InvalidEscape(char, Span),

    #[error("integer literal '{0}' out of range at {1}")]
    IntegerOutOfRange(String, Span),
}

/// Parser errors.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("expected {expected}, found '{found}' at {span}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("unexpected end of input at {0}")]
    UnexpectedEof(Span),
}

impl ParserError {
    pub fn unexpected_token(
        expected: impl Into<String>,
        found: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::UnexpectedToken {
            expected: expected.into(),
            found: found.into(),
            span,
        }
    }
}

/// Bytecode compilation errors.
///
/// Compilation stops at the first error; the partially emitted instructions
/// are discarded along with the compiler.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unknown operator {0}")]
    UnknownOperator(String),

    #[error("undefined variable {0}")]
    UndefinedVariable(String),
}

/// Virtual machine errors.
///
/// The VM halts on the first error. The operand stack is not guaranteed
/// clean afterwards and must not be reused.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("opcode {0} undefined")]
    UnknownOpcode(u8),

    #[error("unsupported types for binary operator: {0} {1}")]
    UnsupportedBinaryTypes(&'static str, &'static str),

    #[error("unknown string operator: {0}")]
    UnknownStringOperator(&'static str),

    #[error("unknown integer operator: {0}")]
    UnknownIntegerOperator(&'static str),

    #[error("unknown operator: {0} ({1} {2})")]
    UnknownComparisonOperator(&'static str, &'static str, &'static str),

    #[error("unsupported type for negation: {0}")]
    UnsupportedNegation(&'static str),

    #[error("unusable as hash key: {0}")]
    UnusableAsHashKey(&'static str),

    #[error("index operator not supported: {0}")]
    IndexOperatorUnsupported(&'static str),

    #[error("stack overflow")]
    StackOverflow,

    #[error("division by zero")]
    DivisionByZero,
}

/// A unified error type for all phases.
#[derive(Debug, Error)]
pub enum MonkeyError {
    #[error("lexer error: {0}")]
    Lexer(#[from] LexerError),

    #[error("parser error: {0}")]
    Parser(#[from] ParserError),

    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
