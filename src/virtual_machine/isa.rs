//! Instruction set and operand types for the contract interpreter.
//!
//! Programs are flat arrays of [`Word`]s: opcodes interleaved with literal
//! operands. On the wire a program is a JSON array mixing opcode mnemonics
//! ("PUSH", "ADD", ...) with plain numbers and strings, which the untagged
//! representations below parse directly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One interpreter instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OpCode {
    Stop,
    Push,
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Eq,
    And,
    Or,
    Jump,
    Jumpi,
    Store,
    Load,
}

impl OpCode {
    /// The wire mnemonic, used in error messages.
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Stop => "STOP",
            OpCode::Push => "PUSH",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Lt => "LT",
            OpCode::Gt => "GT",
            OpCode::Eq => "EQ",
            OpCode::And => "AND",
            OpCode::Or => "OR",
            OpCode::Jump => "JUMP",
            OpCode::Jumpi => "JUMPI",
            OpCode::Store => "STORE",
            OpCode::Load => "LOAD",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A runtime value on the interpreter stack or in contract storage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Num(i64),
    Text(String),
}

impl Value {
    /// The value's type name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Num(_) => "number",
            Value::Text(_) => "string",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Num(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// One word of a program: either an opcode or a literal operand.
///
/// Untagged with [`OpCode`] tried first, so the string "ADD" parses as an
/// opcode while any other string parses as a text literal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Word {
    Op(OpCode),
    Value(Value),
}

impl From<OpCode> for Word {
    fn from(op: OpCode) -> Word {
        Word::Op(op)
    }
}

impl From<i64> for Word {
    fn from(n: i64) -> Word {
        Word::Value(Value::Num(n))
    }
}

impl From<&str> for Word {
    fn from(s: &str) -> Word {
        Word::Value(Value::Text(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_mnemonics_match_wire_encoding() {
        let encoded = serde_json::to_string(&OpCode::Jumpi).expect("serialize");
        assert_eq!(encoded, "\"JUMPI\"");
        let decoded: OpCode = serde_json::from_str("\"STORE\"").expect("deserialize");
        assert_eq!(decoded, OpCode::Store);
    }

    #[test]
    fn program_wire_format_mixes_mnemonics_and_literals() {
        let program: Vec<Word> =
            serde_json::from_str(r#"["PUSH", 2, "PUSH", "key", "STORE", "STOP"]"#)
                .expect("deserialize");
        assert_eq!(
            program,
            vec![
                Word::Op(OpCode::Push),
                Word::from(2),
                Word::Op(OpCode::Push),
                Word::from("key"),
                Word::Op(OpCode::Store),
                Word::Op(OpCode::Stop),
            ]
        );
    }

    #[test]
    fn mnemonic_strings_parse_as_opcodes_not_text() {
        let word: Word = serde_json::from_str("\"ADD\"").expect("deserialize");
        assert_eq!(word, Word::Op(OpCode::Add));
        let word: Word = serde_json::from_str("\"add\"").expect("deserialize");
        assert_eq!(word, Word::from("add"));
    }
}
