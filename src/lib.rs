//! Monkey: a small expression-oriented scripting language.
//!
//! Source text is scanned, parsed, compiled to a compact bytecode, and
//! executed on a stack-based virtual machine. There is no tree-walking
//! path; the bytecode pipeline is the interpreter.

pub mod ast;
pub mod bytecode;
pub mod error;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod repl;
pub mod span;

use ast::Program;
use bytecode::compiler::{Bytecode, Compiler};
use bytecode::vm::Vm;
use error::MonkeyError;
use lexer::Scanner;
use object::Value;
use parser::Parser;

/// Parse source text into a program.
pub fn parse(source: &str) -> Result<Program, MonkeyError> {
    let tokens = Scanner::new(source).scan_tokens()?;
    let program = Parser::new(tokens).parse()?;
    Ok(program)
}

/// Compile source text to bytecode.
pub fn compile(source: &str) -> Result<Bytecode, MonkeyError> {
    let program = parse(source)?;
    let mut compiler = Compiler::new();
    compiler.compile(&program)?;
    Ok(compiler.bytecode())
}

/// Run source text and return the value of its last expression statement.
pub fn run(source: &str) -> Result<Value, MonkeyError> {
    let bytecode = compile(source)?;
    let mut vm = Vm::new(bytecode);
    vm.run()?;
    Ok(vm.last_popped_stack_elem().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_pipeline() {
        assert_eq!(run("(1 + 2) * 3").unwrap(), Value::Integer(9));
    }

    #[test]
    fn test_errors_carry_their_phase() {
        assert!(matches!(run("\"open"), Err(MonkeyError::Lexer(_))));
        assert!(matches!(run("let = 3"), Err(MonkeyError::Parser(_))));
        assert!(matches!(run("nope"), Err(MonkeyError::Compile(_))));
        assert!(matches!(run("1 / 0"), Err(MonkeyError::Runtime(_))));
    }
}
