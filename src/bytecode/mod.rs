//! Bytecode pipeline for Monkey.
//!
//! Source text is lowered to a flat byte stream of instructions plus a
//! constants pool, then executed on a stack-based virtual machine.
//!
//! # Architecture
//!
//! - `instruction`: opcode definitions and the instruction codec
//! - `symbol_table`: identifier-to-global-slot mapping
//! - `compiler`: transforms the AST into bytecode
//! - `vm`: stack-based virtual machine for executing bytecode
//! - `disassembler`: debug output for bytecode inspection

pub mod compiler;
pub mod disassembler;
pub mod instruction;
pub mod symbol_table;
pub mod vm;

pub use self::compiler::{Bytecode, Compiler};
pub use self::disassembler::disassemble;
pub use self::instruction::{make, read_operands, read_u16, Definition, Op};
pub use self::symbol_table::{Symbol, SymbolScope, SymbolTable};
pub use self::vm::{Vm, GLOBAL_SIZE, STACK_SIZE};
