//! Faults the interpreter can raise. Every fault aborts the program; storage
//! writes made before the fault are not rolled back.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum VmError {
    #[error("PUSH at end of code has no operand")]
    TrailingPush,
    #[error("PUSH operand at index {0} is an instruction, not a literal")]
    NonLiteralOperand(usize),
    #[error("jump destination {destination} outside code of length {code_len}")]
    InvalidDestination { destination: i64, code_len: usize },
    #[error("execution limit of {0} instructions exceeded")]
    ExecutionLimitExceeded(usize),
    #[error("{0} on an empty stack")]
    StackUnderflow(&'static str),
    #[error("{instruction} expected a {expected} operand, found {actual}")]
    TypeMismatch {
        instruction: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("{0} executed without a storage trie")]
    StorageUnavailable(&'static str),
    #[error("stored value is not a valid stack value")]
    InvalidStorageValue,
}
