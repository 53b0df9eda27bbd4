//! Segment type for mapped memory regions.
//!
//! Segments partition the analyzed address space. Every function entry,
//! entry point and cross-reference endpoint must fall inside one of them.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::address::Address;
use crate::core::address_range::AddressRange;

bitflags! {
    /// Permission flags for memory segments
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    pub struct Perms: u8 {
        const READ = 1;
        const WRITE = 2;
        const EXECUTE = 4;
    }
}

impl Perms {
    /// Create a permission set from individual flags
    pub fn from_rwx(read: bool, write: bool, execute: bool) -> Self {
        let mut perms = Perms::empty();
        perms.set(Perms::READ, read);
        perms.set(Perms::WRITE, write);
        perms.set(Perms::EXECUTE, execute);
        perms
    }

    /// Check if segment is readable and executable (code segment)
    pub fn is_code(&self) -> bool {
        self.contains(Perms::READ | Perms::EXECUTE) && !self.contains(Perms::WRITE)
    }

    /// Parse the three-character `rwx` form produced by `Display`.
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        if bytes.len() != 3 {
            return None;
        }
        let flag = |b: u8, set: u8| match b {
            b'-' => Some(false),
            b if b == set => Some(true),
            _ => None,
        };
        Some(Perms::from_rwx(
            flag(bytes[0], b'r')?,
            flag(bytes[1], b'w')?,
            flag(bytes[2], b'x')?,
        ))
    }
}

impl fmt::Display for Perms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut perms = String::with_capacity(3);
        perms.push(if self.contains(Perms::READ) { 'r' } else { '-' });
        perms.push(if self.contains(Perms::WRITE) { 'w' } else { '-' });
        perms.push(if self.contains(Perms::EXECUTE) { 'x' } else { '-' });
        write!(f, "{}", perms)
    }
}

/// Mapped memory region
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    /// Segment name as reported by the engine
    pub name: String,
    /// Address range covered by the segment
    pub range: AddressRange,
    /// Memory permissions for the segment
    pub perms: Perms,
    /// Alignment requirement, if the engine knows it
    pub alignment: Option<u64>,
}

impl Segment {
    pub fn new(
        name: impl Into<String>,
        range: AddressRange,
        perms: Perms,
        alignment: Option<u64>,
    ) -> Self {
        Self {
            name: name.into(),
            range,
            perms,
            alignment,
        }
    }

    pub fn start(&self) -> Address {
        self.range.start
    }

    pub fn end(&self) -> Address {
        self.range.end
    }

    pub fn contains(&self, address: Address) -> bool {
        self.range.contains(address)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Segment '{}' {} {}", self.name, self.range, self.perms)
    }
}
