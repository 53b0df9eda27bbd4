//! Cross-reference type.
//!
//! A CrossReference is a directed edge between two addresses. The
//! declaration order of `XrefKind` is the canonical export order for
//! references sharing a source address.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::address::Address;

/// Enum representing the kind of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum XrefKind {
    /// Function call reference
    Call,
    /// Jump or branch reference
    Jump,
    /// Memory read reference
    DataRead,
    /// Memory write reference
    DataWrite,
    /// Address taken as a constant offset
    Offset,
}

impl XrefKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            XrefKind::Call => "call",
            XrefKind::Jump => "jump",
            XrefKind::DataRead => "data-read",
            XrefKind::DataWrite => "data-write",
            XrefKind::Offset => "offset",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        Some(match text {
            "call" => XrefKind::Call,
            "jump" => XrefKind::Jump,
            "data-read" => XrefKind::DataRead,
            "data-write" => XrefKind::DataWrite,
            "offset" => XrefKind::Offset,
            _ => return None,
        })
    }

    pub fn is_code(&self) -> bool {
        matches!(self, XrefKind::Call | XrefKind::Jump)
    }
}

impl fmt::Display for XrefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a cross-reference between code or data locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrossReference {
    /// Source address where the reference originates
    pub from: Address,
    /// Target address
    pub to: Address,
    pub kind: XrefKind,
}

impl CrossReference {
    pub fn new(from: Address, to: Address, kind: XrefKind) -> Self {
        Self { from, to, kind }
    }

    /// Canonical sort key: source, then kind, then target.
    pub fn sort_key(&self) -> (Address, XrefKind, Address) {
        (self.from, self.kind, self.to)
    }
}

impl fmt::Display for CrossReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.from, self.to, self.kind)
    }
}
