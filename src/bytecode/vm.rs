//! Stack-based virtual machine for executing bytecode.

use indexmap::IndexMap;

use crate::bytecode::compiler::Bytecode;
use crate::bytecode::instruction::{read_u16, Op};
use crate::error::RuntimeError;
use crate::object::{HashPair, Value};

/// Fixed capacity of the operand stack.
pub const STACK_SIZE: usize = 2048;
/// Number of global binding slots.
pub const GLOBAL_SIZE: usize = 65536;

/// Result type for VM operations.
pub type VmResult<T> = Result<T, RuntimeError>;

/// The virtual machine: executes one `Bytecode` against an operand stack
/// and a globals array.
pub struct Vm {
    constants: Vec<Value>,
    instructions: Vec<u8>,
    /// Fixed-size operand stack. `sp` points at the next free slot; the
    /// top of the stack is `stack[sp - 1]`.
    stack: Vec<Value>,
    sp: usize,
    globals: Vec<Value>,
}

impl Vm {
    pub fn new(bytecode: Bytecode) -> Self {
        Self::with_global_store(bytecode, new_globals())
    }

    /// Create a VM that reuses an existing globals array, so bindings made
    /// by a previous run stay visible. The REPL threads its globals through
    /// here on every line.
    pub fn with_global_store(bytecode: Bytecode, globals: Vec<Value>) -> Self {
        Self {
            constants: bytecode.constants,
            instructions: bytecode.instructions,
            stack: vec![Value::Null; STACK_SIZE],
            sp: 0,
            globals,
        }
    }

    /// Recover the globals array for the next run.
    pub fn into_globals(self) -> Vec<Value> {
        self.globals
    }

    /// The value on top of the stack, if any.
    pub fn stack_top(&self) -> Option<&Value> {
        if self.sp == 0 {
            None
        } else {
            Some(&self.stack[self.sp - 1])
        }
    }

    /// The element most recently popped off the stack. Because every
    /// expression statement compiles to code ending in OpPop, this is the
    /// result of the last expression statement after `run` returns.
    pub fn last_popped_stack_elem(&self) -> &Value {
        &self.stack[self.sp]
    }

    /// Execute the instruction stream to completion or to the first error.
    pub fn run(&mut self) -> VmResult<()> {
        let mut ip = 0;

        while ip < self.instructions.len() {
            let byte = self.instructions[ip];
            let op = Op::from_u8(byte).ok_or(RuntimeError::UnknownOpcode(byte))?;
            ip += 1;

            match op {
                Op::Constant => {
                    let index = read_u16(&self.instructions[ip..]) as usize;
                    ip += 2;

                    let constant = self.constants[index].clone();
                    self.push(constant)?;
                }

                Op::Add | Op::Sub | Op::Mul | Op::Div => {
                    self.execute_binary_operation(op)?;
                }

                Op::Pop => {
                    self.pop();
                }

                Op::True => self.push(Value::Boolean(true))?,
                Op::False => self.push(Value::Boolean(false))?,
                Op::Null => self.push(Value::Null)?,

                Op::Equal | Op::NotEqual | Op::GreaterThan => {
                    self.execute_comparison(op)?;
                }

                Op::Minus => self.execute_minus_operator()?,
                Op::Bang => self.execute_bang_operator()?,

                Op::Jump => {
                    ip = read_u16(&self.instructions[ip..]) as usize;
                }

                Op::JumpNotTruthy => {
                    let target = read_u16(&self.instructions[ip..]) as usize;
                    ip += 2;

                    let condition = self.pop();
                    if !condition.is_truthy() {
                        ip = target;
                    }
                }

                Op::SetGlobal => {
                    let index = read_u16(&self.instructions[ip..]) as usize;
                    ip += 2;

                    self.globals[index] = self.pop();
                }

                Op::GetGlobal => {
                    let index = read_u16(&self.instructions[ip..]) as usize;
                    ip += 2;

                    let value = self.globals[index].clone();
                    self.push(value)?;
                }

                Op::Array => {
                    let count = read_u16(&self.instructions[ip..]) as usize;
                    ip += 2;

                    let array = self.build_array(self.sp - count, self.sp);
                    self.sp -= count;
                    self.push(array)?;
                }

                Op::Hash => {
                    let count = read_u16(&self.instructions[ip..]) as usize;
                    ip += 2;

                    let hash = self.build_hash(self.sp - count, self.sp)?;
                    self.sp -= count;
                    self.push(hash)?;
                }

                Op::Index => {
                    let index = self.pop();
                    let left = self.pop();
                    self.execute_index_expression(left, index)?;
                }
            }
        }

        Ok(())
    }

    fn execute_binary_operation(&mut self, op: Op) -> VmResult<()> {
        let right = self.pop();
        let left = self.pop();

        match (left, right) {
            (Value::Integer(left), Value::Integer(right)) => {
                self.execute_integer_binary_operation(op, left, right)
            }
            (Value::String(left), Value::String(right)) => {
                self.execute_string_binary_operation(op, &left, &right)
            }
            (left, right) => Err(RuntimeError::UnsupportedBinaryTypes(
                left.type_name(),
                right.type_name(),
            )),
        }
    }

    fn execute_integer_binary_operation(&mut self, op: Op, left: i64, right: i64) -> VmResult<()> {
        let result = match op {
            Op::Add => left.wrapping_add(right),
            Op::Sub => left.wrapping_sub(right),
            Op::Mul => left.wrapping_mul(right),
            Op::Div => {
                if right == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                left.wrapping_div(right)
            }
            _ => return Err(RuntimeError::UnknownIntegerOperator(op.definition().name)),
        };

        self.push(Value::Integer(result))
    }

    fn execute_string_binary_operation(&mut self, op: Op, left: &str, right: &str) -> VmResult<()> {
        if op != Op::Add {
            return Err(RuntimeError::UnknownStringOperator(op.definition().name));
        }

        self.push(Value::String(format!("{}{}", left, right)))
    }

    fn execute_comparison(&mut self, op: Op) -> VmResult<()> {
        let right = self.pop();
        let left = self.pop();

        if let (Value::Integer(left), Value::Integer(right)) = (&left, &right) {
            return self.execute_integer_comparison(op, *left, *right);
        }

        match op {
            Op::Equal => self.push(Value::Boolean(left == right)),
            Op::NotEqual => self.push(Value::Boolean(left != right)),
            _ => Err(RuntimeError::UnknownComparisonOperator(
                op.definition().name,
                left.type_name(),
                right.type_name(),
            )),
        }
    }

    fn execute_integer_comparison(&mut self, op: Op, left: i64, right: i64) -> VmResult<()> {
        let result = match op {
            Op::Equal => left == right,
            Op::NotEqual => left != right,
            Op::GreaterThan => left > right,
            _ => {
                return Err(RuntimeError::UnknownComparisonOperator(
                    op.definition().name,
                    "Integer",
                    "Integer",
                ));
            }
        };

        self.push(Value::Boolean(result))
    }

    fn execute_bang_operator(&mut self) -> VmResult<()> {
        let operand = self.pop();
        let result = matches!(operand, Value::Boolean(false) | Value::Null);
        self.push(Value::Boolean(result))
    }

    fn execute_minus_operator(&mut self) -> VmResult<()> {
        match self.pop() {
            Value::Integer(n) => self.push(Value::Integer(n.wrapping_neg())),
            operand => Err(RuntimeError::UnsupportedNegation(operand.type_name())),
        }
    }

    fn build_array(&self, start: usize, end: usize) -> Value {
        Value::Array(self.stack[start..end].to_vec())
    }

    fn build_hash(&self, start: usize, end: usize) -> VmResult<Value> {
        let mut pairs = IndexMap::new();

        let mut i = start;
        while i < end {
            let key = self.stack[i].clone();
            let value = self.stack[i + 1].clone();

            let hash_key = key
                .hash_key()
                .ok_or_else(|| RuntimeError::UnusableAsHashKey(key.type_name()))?;
            pairs.insert(hash_key, HashPair { key, value });

            i += 2;
        }

        Ok(Value::Hash(pairs))
    }

    fn execute_index_expression(&mut self, left: Value, index: Value) -> VmResult<()> {
        match (left, index) {
            (Value::Array(elements), Value::Integer(i)) => {
                if i < 0 || i as usize >= elements.len() {
                    self.push(Value::Null)
                } else {
                    let element = elements[i as usize].clone();
                    self.push(element)
                }
            }
            (Value::Hash(pairs), index) => {
                let key = index
                    .hash_key()
                    .ok_or_else(|| RuntimeError::UnusableAsHashKey(index.type_name()))?;
                match pairs.get(&key) {
                    Some(pair) => {
                        let value = pair.value.clone();
                        self.push(value)
                    }
                    None => self.push(Value::Null),
                }
            }
            (left, _) => Err(RuntimeError::IndexOperatorUnsupported(left.type_name())),
        }
    }

    fn push(&mut self, value: Value) -> VmResult<()> {
        if self.sp >= STACK_SIZE {
            return Err(RuntimeError::StackOverflow);
        }

        self.stack[self.sp] = value;
        self.sp += 1;
        Ok(())
    }

    /// The popped slot keeps its value so `last_popped_stack_elem` stays
    /// valid. Underflow cannot occur on bytecode produced by the compiler.
    fn pop(&mut self) -> Value {
        debug_assert!(self.sp > 0, "stack underflow");
        self.sp -= 1;
        self.stack[self.sp].clone()
    }
}

fn new_globals() -> Vec<Value> {
    vec![Value::Null; GLOBAL_SIZE]
}
