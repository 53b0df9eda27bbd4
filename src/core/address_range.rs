//! AddressRange type for half-open address intervals.
//!
//! Segments and functions both occupy contiguous `[start, end)` regions;
//! this type carries the bounds and the containment/overlap checks the
//! canonicalizer relies on.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::address::Address;

/// A half-open contiguous address region `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AddressRange {
    /// The starting address of the range (inclusive)
    pub start: Address,
    /// The ending address of the range (exclusive)
    pub end: Address,
}

impl AddressRange {
    /// Create a new range. Fails if `end` precedes `start`.
    pub fn new(start: Address, end: Address) -> Result<Self, String> {
        if end < start {
            return Err(format!("range end {} precedes start {}", end, start));
        }
        Ok(Self { start, end })
    }

    /// Create a range from a start and a size in bytes.
    pub fn with_size(start: Address, size: u64) -> Result<Self, String> {
        let end = start
            .checked_add(size)
            .ok_or_else(|| format!("range {}+{:#x} overflows", start, size))?;
        Ok(Self { start, end })
    }

    /// Size of the range in bytes.
    pub fn size(&self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, address: Address) -> bool {
        address >= self.start && address < self.end
    }

    pub fn contains_range(&self, other: &AddressRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: &AddressRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
