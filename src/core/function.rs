//! Function and BasicBlock types.
//!
//! A function owns its basic blocks, and each block owns its
//! instructions. Order inside the vectors is whatever the engine
//! produced; the canonicalizer imposes address order on export.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::address::Address;
use crate::core::address_range::AddressRange;
use crate::core::instruction::Instruction;

/// Straight-line run of instructions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BasicBlock {
    /// Starting address of the basic block
    pub start: Address,
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    pub fn new(start: Address, instructions: Vec<Instruction>) -> Self {
        Self {
            start,
            instructions,
        }
    }

    /// Number of instructions in this basic block
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }
}

/// Represents a function in the analysis database
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Function {
    /// Function name
    pub name: String,

    /// Entry point address
    pub entry: Address,

    /// Bounding address range of the function
    pub range: AddressRange,

    /// Calling convention tag, when the engine recovered one
    pub calling_convention: Option<String>,

    /// Basic blocks in the function
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    pub fn new(name: impl Into<String>, entry: Address, range: AddressRange) -> Self {
        Self {
            name: name.into(),
            entry,
            range,
            calling_convention: None,
            blocks: Vec::new(),
        }
    }

    pub fn with_calling_convention(mut self, cc: impl Into<String>) -> Self {
        self.calling_convention = Some(cc.into());
        self
    }

    pub fn with_block(mut self, block: BasicBlock) -> Self {
        self.blocks.push(block);
        self
    }

    /// Total number of instructions across all blocks
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(BasicBlock::instruction_count).sum()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function '{}' @ {}", self.name, self.entry)
    }
}
