//! Bytecode compiler: transforms the AST into bytecode.

use crate::ast::{BlockStatement, Expr, ExprKind, InfixOp, PrefixOp, Program, Stmt, StmtKind};
use crate::bytecode::instruction::{make, Op};
use crate::bytecode::symbol_table::SymbolTable;
use crate::error::CompileError;
use crate::object::Value;

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// The compiled artifact: a flat instruction stream plus the constants it
/// references by index.
#[derive(Debug, Clone)]
pub struct Bytecode {
    pub instructions: Vec<u8>,
    pub constants: Vec<Value>,
}

/// The opcode and position of an instruction that was already emitted.
#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    opcode: Op,
    position: usize,
}

/// The bytecode compiler.
pub struct Compiler {
    instructions: Vec<u8>,
    constants: Vec<Value>,
    /// The most recently emitted instruction and the one before it. Needed
    /// to strip the trailing OpPop inside `if` branches.
    last_instruction: Option<EmittedInstruction>,
    previous_instruction: Option<EmittedInstruction>,
    symbol_table: SymbolTable,
}

impl Compiler {
    /// Create a compiler with empty state.
    pub fn new() -> Self {
        Self::with_state(SymbolTable::new(), Vec::new())
    }

    /// Create a compiler that keeps compiling on top of an existing symbol
    /// table and constants pool. The REPL uses this to carry bindings from
    /// one line to the next.
    pub fn with_state(symbol_table: SymbolTable, constants: Vec<Value>) -> Self {
        Self {
            instructions: Vec::new(),
            constants,
            last_instruction: None,
            previous_instruction: None,
            symbol_table,
        }
    }

    /// Compile a program.
    pub fn compile(&mut self, program: &Program) -> CompileResult<()> {
        for statement in &program.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    /// The compiled output so far.
    pub fn bytecode(&self) -> Bytecode {
        Bytecode {
            instructions: self.instructions.clone(),
            constants: self.constants.clone(),
        }
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbol_table
    }

    fn compile_statement(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match &stmt.kind {
            StmtKind::Expression(expr) => {
                self.compile_expression(expr)?;
                // Every expression statement leaves nothing on the stack.
                self.emit(Op::Pop, &[]);
            }

            StmtKind::Let { name, value } => {
                self.compile_expression(value)?;
                let symbol = self.symbol_table.define(name);
                self.emit(Op::SetGlobal, &[symbol.index]);
            }
        }

        Ok(())
    }

    fn compile_expression(&mut self, expr: &Expr) -> CompileResult<()> {
        match &expr.kind {
            ExprKind::IntegerLiteral(n) => {
                let index = self.add_constant(Value::Integer(*n));
                self.emit(Op::Constant, &[index]);
            }

            ExprKind::StringLiteral(s) => {
                let index = self.add_constant(Value::String(s.clone()));
                self.emit(Op::Constant, &[index]);
            }

            ExprKind::BooleanLiteral(b) => {
                if *b {
                    self.emit(Op::True, &[]);
                } else {
                    self.emit(Op::False, &[]);
                }
            }

            ExprKind::NullLiteral => {
                self.emit(Op::Null, &[]);
            }

            ExprKind::Identifier(name) => {
                let symbol = self
                    .symbol_table
                    .resolve(name)
                    .cloned()
                    .ok_or_else(|| CompileError::UndefinedVariable(name.clone()))?;
                self.emit(Op::GetGlobal, &[symbol.index]);
            }

            ExprKind::Prefix { operator, right } => {
                self.compile_expression(right)?;
                let op = match operator {
                    PrefixOp::Negate => Op::Minus,
                    PrefixOp::Not => Op::Bang,
                };
                self.emit(op, &[]);
            }

            ExprKind::Infix {
                left,
                operator,
                right,
            } => match operator {
                InfixOp::Less => {
                    // The VM only knows greater-than; compile the operands
                    // swapped.
                    self.compile_expression(right)?;
                    self.compile_expression(left)?;
                    self.emit(Op::GreaterThan, &[]);
                }
                _ => {
                    self.compile_expression(left)?;
                    self.compile_expression(right)?;
                    let op = match operator {
                        InfixOp::Add => Op::Add,
                        InfixOp::Subtract => Op::Sub,
                        InfixOp::Multiply => Op::Mul,
                        InfixOp::Divide => Op::Div,
                        InfixOp::Greater => Op::GreaterThan,
                        InfixOp::Equal => Op::Equal,
                        InfixOp::NotEqual => Op::NotEqual,
                        other => {
                            return Err(CompileError::UnknownOperator(other.to_string()));
                        }
                    };
                    self.emit(op, &[]);
                }
            },

            ExprKind::If {
                condition,
                consequence,
                alternative,
            } => {
                self.compile_expression(condition)?;

                // Placeholder target, back-patched once the consequence is
                // compiled.
                let jump_not_truthy = self.emit(Op::JumpNotTruthy, &[9999]);

                self.compile_branch(consequence)?;

                let jump = self.emit(Op::Jump, &[9999]);
                self.change_operand(jump_not_truthy, self.instructions.len());

                match alternative {
                    Some(block) => self.compile_branch(block)?,
                    None => {
                        self.emit(Op::Null, &[]);
                    }
                }

                self.change_operand(jump, self.instructions.len());
            }

            ExprKind::Array(elements) => {
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(Op::Array, &[elements.len()]);
            }

            ExprKind::Hash(pairs) => {
                let mut sorted: Vec<&(Expr, Expr)> = pairs.iter().collect();
                // Deterministic emission order, keyed on the printed key
                // expression.
                sorted.sort_by_key(|(key, _)| key.to_string());

                for (key, value) in &sorted {
                    self.compile_expression(key)?;
                    self.compile_expression(value)?;
                }
                self.emit(Op::Hash, &[sorted.len() * 2]);
            }

            ExprKind::Index { left, index } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.emit(Op::Index, &[]);
            }
        }

        Ok(())
    }

    /// Compile one branch of an `if` so that exactly one value is left on
    /// the stack: either the branch's final expression (whose trailing
    /// OpPop is removed) or null when the branch produces no value.
    fn compile_branch(&mut self, block: &BlockStatement) -> CompileResult<()> {
        for statement in &block.statements {
            self.compile_statement(statement)?;
        }

        if self.last_instruction_is(Op::Pop) {
            self.remove_last_pop();
        } else {
            self.emit(Op::Null, &[]);
        }

        Ok(())
    }

    // ===== Bytecode emission =====

    fn emit(&mut self, op: Op, operands: &[usize]) -> usize {
        let instruction = make(op, operands);
        let position = self.instructions.len();
        self.instructions.extend_from_slice(&instruction);

        self.previous_instruction = self.last_instruction;
        self.last_instruction = Some(EmittedInstruction {
            opcode: op,
            position,
        });

        position
    }

    fn last_instruction_is(&self, op: Op) -> bool {
        matches!(self.last_instruction, Some(last) if last.opcode == op)
    }

    fn remove_last_pop(&mut self) {
        if let Some(last) = self.last_instruction {
            self.instructions.truncate(last.position);
            self.last_instruction = self.previous_instruction;
        }
    }

    /// Rewrite the 2-byte operand of the instruction at `position`.
    fn change_operand(&mut self, position: usize, operand: usize) {
        let bytes = (operand as u16).to_be_bytes();
        self.instructions[position + 1] = bytes[0];
        self.instructions[position + 2] = bytes[1];
    }

    fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Scanner;
    use crate::parser::Parser;

    fn compile_source(source: &str) -> CompileResult<Bytecode> {
        let tokens = Scanner::new(source).scan_tokens().expect("lexer error");
        let program = Parser::new(tokens).parse().expect("parser error");

        let mut compiler = Compiler::new();
        compiler.compile(&program)?;
        Ok(compiler.bytecode())
    }

    fn concat(instructions: &[Vec<u8>]) -> Vec<u8> {
        instructions.concat()
    }

    #[track_caller]
    fn assert_compiles(source: &str, constants: &[Value], instructions: &[Vec<u8>]) {
        let bytecode = compile_source(source).expect("compile error");
        assert_eq!(bytecode.constants, constants, "constants for {}", source);
        assert_eq!(
            bytecode.instructions,
            concat(instructions),
            "instructions for {}",
            source
        );
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_compiles(
            "1 + 2",
            &[Value::Integer(1), Value::Integer(2)],
            &[
                make(Op::Constant, &[0]),
                make(Op::Constant, &[1]),
                make(Op::Add, &[]),
                make(Op::Pop, &[]),
            ],
        );
        assert_compiles(
            "1; 2",
            &[Value::Integer(1), Value::Integer(2)],
            &[
                make(Op::Constant, &[0]),
                make(Op::Pop, &[]),
                make(Op::Constant, &[1]),
                make(Op::Pop, &[]),
            ],
        );
        assert_compiles(
            "1 - 2",
            &[Value::Integer(1), Value::Integer(2)],
            &[
                make(Op::Constant, &[0]),
                make(Op::Constant, &[1]),
                make(Op::Sub, &[]),
                make(Op::Pop, &[]),
            ],
        );
        assert_compiles(
            "1 * 2",
            &[Value::Integer(1), Value::Integer(2)],
            &[
                make(Op::Constant, &[0]),
                make(Op::Constant, &[1]),
                make(Op::Mul, &[]),
                make(Op::Pop, &[]),
            ],
        );
        assert_compiles(
            "2 / 1",
            &[Value::Integer(2), Value::Integer(1)],
            &[
                make(Op::Constant, &[0]),
                make(Op::Constant, &[1]),
                make(Op::Div, &[]),
                make(Op::Pop, &[]),
            ],
        );
        assert_compiles(
            "-1",
            &[Value::Integer(1)],
            &[
                make(Op::Constant, &[0]),
                make(Op::Minus, &[]),
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_boolean_expressions() {
        assert_compiles("true", &[], &[make(Op::True, &[]), make(Op::Pop, &[])]);
        assert_compiles("false", &[], &[make(Op::False, &[]), make(Op::Pop, &[])]);
        assert_compiles(
            "1 > 2",
            &[Value::Integer(1), Value::Integer(2)],
            &[
                make(Op::Constant, &[0]),
                make(Op::Constant, &[1]),
                make(Op::GreaterThan, &[]),
                make(Op::Pop, &[]),
            ],
        );
        assert_compiles(
            "1 == 2",
            &[Value::Integer(1), Value::Integer(2)],
            &[
                make(Op::Constant, &[0]),
                make(Op::Constant, &[1]),
                make(Op::Equal, &[]),
                make(Op::Pop, &[]),
            ],
        );
        assert_compiles(
            "true != false",
            &[],
            &[
                make(Op::True, &[]),
                make(Op::False, &[]),
                make(Op::NotEqual, &[]),
                make(Op::Pop, &[]),
            ],
        );
        assert_compiles(
            "!true",
            &[],
            &[
                make(Op::True, &[]),
                make(Op::Bang, &[]),
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_less_than_swaps_operands() {
        // 1 < 2 compiles the operands in reverse and reuses OpGreaterThan.
        assert_compiles(
            "1 < 2",
            &[Value::Integer(2), Value::Integer(1)],
            &[
                make(Op::Constant, &[0]),
                make(Op::Constant, &[1]),
                make(Op::GreaterThan, &[]),
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_conditional_with_alternative() {
        assert_compiles(
            "if (true) { 10 } else { 20 }; 3333;",
            &[
                Value::Integer(10),
                Value::Integer(20),
                Value::Integer(3333),
            ],
            &[
                // 0000
                make(Op::True, &[]),
                // 0001
                make(Op::JumpNotTruthy, &[10]),
                // 0004
                make(Op::Constant, &[0]),
                // 0007
                make(Op::Jump, &[13]),
                // 0010
                make(Op::Constant, &[1]),
                // 0013
                make(Op::Pop, &[]),
                // 0014
                make(Op::Constant, &[2]),
                // 0017
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_conditional_without_alternative() {
        assert_compiles(
            "if (true) { 10 }; 3333;",
            &[Value::Integer(10), Value::Integer(3333)],
            &[
                // 0000
                make(Op::True, &[]),
                // 0001
                make(Op::JumpNotTruthy, &[10]),
                // 0004
                make(Op::Constant, &[0]),
                // 0007
                make(Op::Jump, &[11]),
                // 0010
                make(Op::Null, &[]),
                // 0011
                make(Op::Pop, &[]),
                // 0012
                make(Op::Constant, &[1]),
                // 0015
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_branch_without_value_yields_null() {
        // A branch ending in a binding leaves null as the if-value.
        assert_compiles(
            "if (true) { let x = 1 }",
            &[Value::Integer(1)],
            &[
                // 0000
                make(Op::True, &[]),
                // 0001
                make(Op::JumpNotTruthy, &[14]),
                // 0004
                make(Op::Constant, &[0]),
                // 0007
                make(Op::SetGlobal, &[0]),
                // 0010
                make(Op::Null, &[]),
                // 0011
                make(Op::Jump, &[15]),
                // 0014
                make(Op::Null, &[]),
                // 0015
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_global_let_statements() {
        assert_compiles(
            "let one = 1; let two = 2;",
            &[Value::Integer(1), Value::Integer(2)],
            &[
                make(Op::Constant, &[0]),
                make(Op::SetGlobal, &[0]),
                make(Op::Constant, &[1]),
                make(Op::SetGlobal, &[1]),
            ],
        );
        assert_compiles(
            "let one = 1; one;",
            &[Value::Integer(1)],
            &[
                make(Op::Constant, &[0]),
                make(Op::SetGlobal, &[0]),
                make(Op::GetGlobal, &[0]),
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_redefined_global_reuses_slot() {
        assert_compiles(
            "let x = 1; let x = 2; x;",
            &[Value::Integer(1), Value::Integer(2)],
            &[
                make(Op::Constant, &[0]),
                make(Op::SetGlobal, &[0]),
                make(Op::Constant, &[1]),
                make(Op::SetGlobal, &[0]),
                make(Op::GetGlobal, &[0]),
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_string_expressions() {
        assert_compiles(
            "\"monkey\"",
            &[Value::String("monkey".to_string())],
            &[make(Op::Constant, &[0]), make(Op::Pop, &[])],
        );
        assert_compiles(
            "\"mon\" + \"key\"",
            &[
                Value::String("mon".to_string()),
                Value::String("key".to_string()),
            ],
            &[
                make(Op::Constant, &[0]),
                make(Op::Constant, &[1]),
                make(Op::Add, &[]),
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_array_literals() {
        assert_compiles("[]", &[], &[make(Op::Array, &[0]), make(Op::Pop, &[])]);
        assert_compiles(
            "[1, 2, 3]",
            &[Value::Integer(1), Value::Integer(2), Value::Integer(3)],
            &[
                make(Op::Constant, &[0]),
                make(Op::Constant, &[1]),
                make(Op::Constant, &[2]),
                make(Op::Array, &[3]),
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_hash_literals() {
        assert_compiles("{}", &[], &[make(Op::Hash, &[0]), make(Op::Pop, &[])]);
        assert_compiles(
            "{1: 2, 3: 4, 5: 6}",
            &[
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(3),
                Value::Integer(4),
                Value::Integer(5),
                Value::Integer(6),
            ],
            &[
                make(Op::Constant, &[0]),
                make(Op::Constant, &[1]),
                make(Op::Constant, &[2]),
                make(Op::Constant, &[3]),
                make(Op::Constant, &[4]),
                make(Op::Constant, &[5]),
                make(Op::Hash, &[6]),
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_hash_literal_keys_are_sorted() {
        // Pairs are emitted sorted by the printed key, not source order.
        assert_compiles(
            "{3: 4, 1: 2}",
            &[
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(3),
                Value::Integer(4),
            ],
            &[
                make(Op::Constant, &[0]),
                make(Op::Constant, &[1]),
                make(Op::Constant, &[2]),
                make(Op::Constant, &[3]),
                make(Op::Hash, &[4]),
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_index_expressions() {
        assert_compiles(
            "[1, 2][0]",
            &[Value::Integer(1), Value::Integer(2), Value::Integer(0)],
            &[
                make(Op::Constant, &[0]),
                make(Op::Constant, &[1]),
                make(Op::Array, &[2]),
                make(Op::Constant, &[2]),
                make(Op::Index, &[]),
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_undefined_variable() {
        let err = compile_source("foobar").expect_err("expected compile error");
        assert!(matches!(err, CompileError::UndefinedVariable(name) if name == "foobar"));
        assert_eq!(
            compile_source("x + 1").expect_err("undefined").to_string(),
            "undefined variable x"
        );
    }

    #[test]
    fn test_unknown_operator() {
        let err = compile_source("1 <= 2").expect_err("expected compile error");
        assert_eq!(err.to_string(), "unknown operator <=");
        let err = compile_source("1 >= 2").expect_err("expected compile error");
        assert!(matches!(err, CompileError::UnknownOperator(op) if op == ">="));
    }

    #[test]
    fn test_with_state_appends_to_constants() {
        let mut compiler = Compiler::with_state(
            SymbolTable::new(),
            vec![Value::Integer(99)],
        );
        let tokens = Scanner::new("7").scan_tokens().unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        compiler.compile(&program).unwrap();

        let bytecode = compiler.bytecode();
        assert_eq!(
            bytecode.constants,
            vec![Value::Integer(99), Value::Integer(7)]
        );
        // The new literal references index 1, past the pre-existing pool.
        assert_eq!(
            bytecode.instructions,
            concat(&[make(Op::Constant, &[1]), make(Op::Pop, &[])])
        );
    }
}
