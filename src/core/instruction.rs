//! Instruction and Operand types for decoded assembly instructions.
//!
//! The exporter does not decode anything; these carry what the engine
//! already decided: where the instruction is, how long it is and how its
//! operands render.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::address::Address;

/// Types of operands that can appear in instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OperandKind {
    /// Register operand
    Register,
    /// Immediate value operand
    Immediate,
    /// Memory reference operand
    Memory,
    /// Code or data address operand
    Address,
    /// Anything the engine could not classify
    Other,
}

impl OperandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperandKind::Register => "register",
            OperandKind::Immediate => "immediate",
            OperandKind::Memory => "memory",
            OperandKind::Address => "address",
            OperandKind::Other => "other",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        Some(match text {
            "register" => OperandKind::Register,
            "immediate" => OperandKind::Immediate,
            "memory" => OperandKind::Memory,
            "address" => OperandKind::Address,
            "other" => OperandKind::Other,
            _ => return None,
        })
    }
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operand with its rendered text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operand {
    pub kind: OperandKind,
    pub text: String,
}

impl Operand {
    pub fn new(kind: OperandKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn register(name: impl Into<String>) -> Self {
        Self::new(OperandKind::Register, name)
    }

    pub fn immediate(value: i64) -> Self {
        let text = if value < 0 {
            format!("-{:#x}", value.unsigned_abs())
        } else {
            format!("{:#x}", value)
        };
        Self::new(OperandKind::Immediate, text)
    }
}

/// Decoded instruction at a specific address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    pub address: Address,
    /// Encoded length in bytes
    pub length: u32,
    pub mnemonic: String,
    pub operands: Vec<Operand>,
    pub comment: Option<String>,
}

impl Instruction {
    pub fn new(address: Address, length: u32, mnemonic: impl Into<String>) -> Self {
        Self {
            address,
            length,
            mnemonic: mnemonic.into(),
            operands: Vec::new(),
            comment: None,
        }
    }

    pub fn with_operand(mut self, operand: Operand) -> Self {
        self.operands.push(operand);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Address of the byte immediately following this instruction.
    pub fn end_address(&self) -> Option<Address> {
        self.address.checked_add(u64::from(self.length))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.address, self.mnemonic)?;
        for (i, op) in self.operands.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}", sep, op.text)?;
        }
        Ok(())
    }
}
