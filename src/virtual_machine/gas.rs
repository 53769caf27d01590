//! Static gas schedule.

use crate::virtual_machine::isa::OpCode;

/// Gas charged for executing one instruction.
///
/// Control words are free, arithmetic and comparison cost one unit, jumps two,
/// and storage access five.
pub fn cost(op: OpCode) -> u64 {
    match op {
        OpCode::Stop | OpCode::Push => 0,
        OpCode::Add
        | OpCode::Sub
        | OpCode::Mul
        | OpCode::Div
        | OpCode::Lt
        | OpCode::Gt
        | OpCode::Eq
        | OpCode::And
        | OpCode::Or => 1,
        OpCode::Jump | OpCode::Jumpi => 2,
        OpCode::Store | OpCode::Load => 5,
    }
}
