//! Stack-machine interpreter for contract code.
//!
//! Executes a flat [`Word`] array with a value stack, a bounded instruction
//! budget, and per-instruction gas accounting. Contract storage is injected as
//! a mutable trie borrow; programs without storage access run fine without
//! one. Faults abort immediately and storage writes made before the fault
//! stay put.

use crate::storage::trie::Trie;
use crate::types::hash::to_json;
use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::gas;
use crate::virtual_machine::isa::{OpCode, Value, Word};

/// Hard cap on executed instructions, independent of gas. Catches infinite
/// loops even under a generous gas limit.
pub const EXECUTION_LIMIT: usize = 10_000;

/// What a finished program produced.
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    /// Top of the stack at `STOP`, or `None` when execution ran off the end
    /// of the code or stopped with an empty stack.
    pub result: Option<Value>,
    /// Total gas charged across every executed instruction.
    pub gas_used: u64,
}

/// One program execution. Build a fresh interpreter per run.
pub struct Interpreter<'a> {
    program_counter: usize,
    execution_count: usize,
    stack: Vec<Value>,
    storage: Option<&'a mut Trie>,
}

impl<'a> Interpreter<'a> {
    /// An interpreter with no storage trie. `STORE` and `LOAD` will fault.
    pub fn new() -> Interpreter<'a> {
        Interpreter {
            program_counter: 0,
            execution_count: 0,
            stack: Vec::new(),
            storage: None,
        }
    }

    /// An interpreter whose `STORE`/`LOAD` operate on `storage`.
    pub fn with_storage(storage: &'a mut Trie) -> Interpreter<'a> {
        Interpreter {
            storage: Some(storage),
            ..Interpreter::new()
        }
    }

    /// Runs `code` to completion or fault.
    pub fn run(&mut self, code: &[Word]) -> Result<Outcome, VmError> {
        let mut gas_used = 0u64;

        while self.program_counter < code.len() {
            self.execution_count += 1;
            if self.execution_count > EXECUTION_LIMIT {
                return Err(VmError::ExecutionLimitExceeded(EXECUTION_LIMIT));
            }

            let op = match &code[self.program_counter] {
                // A literal in instruction position is skipped, matching the
                // behavior of running straight through inline PUSH operands.
                Word::Value(_) => {
                    self.program_counter += 1;
                    continue;
                }
                Word::Op(op) => *op,
            };

            gas_used += gas::cost(op);

            match op {
                OpCode::Stop => {
                    return Ok(Outcome {
                        result: self.stack.last().cloned(),
                        gas_used,
                    });
                }
                OpCode::Push => {
                    let operand_index = self.program_counter + 1;
                    match code.get(operand_index) {
                        None => return Err(VmError::TrailingPush),
                        Some(Word::Op(_)) => {
                            return Err(VmError::NonLiteralOperand(operand_index));
                        }
                        Some(Word::Value(value)) => self.stack.push(value.clone()),
                    }
                    self.program_counter += 2;
                    continue;
                }
                OpCode::Add => self.binary_numeric(op, |a, b| Ok(a.wrapping_add(b)))?,
                OpCode::Sub => self.binary_numeric(op, |a, b| Ok(a.wrapping_sub(b)))?,
                OpCode::Mul => self.binary_numeric(op, |a, b| Ok(a.wrapping_mul(b)))?,
                OpCode::Div => self.binary_numeric(op, |a, b| {
                    if b == 0 {
                        Err(VmError::DivisionByZero)
                    } else {
                        Ok(a.wrapping_div(b))
                    }
                })?,
                OpCode::Lt => self.binary_numeric(op, |a, b| Ok((a < b) as i64))?,
                OpCode::Gt => self.binary_numeric(op, |a, b| Ok((a > b) as i64))?,
                OpCode::And => {
                    self.binary_numeric(op, |a, b| Ok((a != 0 && b != 0) as i64))?
                }
                OpCode::Or => self.binary_numeric(op, |a, b| Ok((a != 0 || b != 0) as i64))?,
                OpCode::Eq => {
                    let b = self.pop(op)?;
                    let a = self.pop(op)?;
                    self.stack.push(Value::Num((a == b) as i64));
                }
                OpCode::Jump => {
                    let destination = self.pop_num(op)?;
                    self.program_counter = self.checked_destination(destination, code.len())?;
                    continue;
                }
                OpCode::Jumpi => {
                    let condition = self.pop_num(op)?;
                    if condition == 1 {
                        let destination = self.pop_num(op)?;
                        self.program_counter =
                            self.checked_destination(destination, code.len())?;
                        continue;
                    }
                    // Branch not taken: the destination stays on the stack.
                }
                OpCode::Store => {
                    let key = self.pop_text(op)?;
                    let value = self.pop(op)?;
                    let storage = self
                        .storage
                        .as_deref_mut()
                        .ok_or(VmError::StorageUnavailable(op.mnemonic()))?;
                    storage.put(&key, to_json(&value));
                }
                OpCode::Load => {
                    let key = self.pop_text(op)?;
                    let storage = self
                        .storage
                        .as_deref()
                        .ok_or(VmError::StorageUnavailable(op.mnemonic()))?;
                    let value = match storage.get(&key) {
                        None => Value::Null,
                        Some(json) => serde_json::from_value(json)
                            .map_err(|_| VmError::InvalidStorageValue)?,
                    };
                    self.stack.push(value);
                }
            }

            self.program_counter += 1;
        }

        // Ran off the end without STOP: no result, but gas was still spent.
        Ok(Outcome {
            result: None,
            gas_used,
        })
    }

    fn pop(&mut self, op: OpCode) -> Result<Value, VmError> {
        self.stack
            .pop()
            .ok_or(VmError::StackUnderflow(op.mnemonic()))
    }

    fn pop_num(&mut self, op: OpCode) -> Result<i64, VmError> {
        match self.pop(op)? {
            Value::Num(n) => Ok(n),
            other => Err(VmError::TypeMismatch {
                instruction: op.mnemonic(),
                expected: "number",
                actual: other.type_name(),
            }),
        }
    }

    fn pop_text(&mut self, op: OpCode) -> Result<String, VmError> {
        match self.pop(op)? {
            Value::Text(s) => Ok(s),
            other => Err(VmError::TypeMismatch {
                instruction: op.mnemonic(),
                expected: "string",
                actual: other.type_name(),
            }),
        }
    }

    /// Pops `b` then `a` and pushes `f(a, b)`. The second operand comes off
    /// the stack first, so `[PUSH 2, PUSH 3, SUB]` computes `2 - 3`.
    fn binary_numeric(
        &mut self,
        op: OpCode,
        f: impl FnOnce(i64, i64) -> Result<i64, VmError>,
    ) -> Result<(), VmError> {
        let b = self.pop_num(op)?;
        let a = self.pop_num(op)?;
        self.stack.push(Value::Num(f(a, b)?));
        Ok(())
    }

    fn checked_destination(&self, destination: i64, code_len: usize) -> Result<usize, VmError> {
        if destination < 0 || destination as usize > code_len {
            return Err(VmError::InvalidDestination {
                destination,
                code_len,
            });
        }
        Ok(destination as usize)
    }
}

impl Default for Interpreter<'_> {
    fn default() -> Self {
        Interpreter::new()
    }
}
