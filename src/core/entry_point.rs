//! Program entry points.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::address::Address;

/// Exported entry into the program
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryPoint {
    pub address: Address,
    pub ordinal: u32,
    pub name: String,
}

impl EntryPoint {
    pub fn new(address: Address, ordinal: u32, name: impl Into<String>) -> Self {
        Self {
            address,
            ordinal,
            name: name.into(),
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} @ {}", self.ordinal, self.name, self.address)
    }
}
