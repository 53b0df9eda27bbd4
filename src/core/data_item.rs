//! Typed data definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::address::Address;

/// A data definition placed by the engine at a fixed address
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DataItem {
    pub address: Address,
    /// Size in bytes
    pub size: u64,
    /// Name of the declared type, if the engine assigned one
    pub type_name: Option<String>,
    /// Initial value bytes; when present the length equals `size`
    pub value: Option<Vec<u8>>,
}

impl DataItem {
    pub fn new(address: Address, size: u64) -> Self {
        Self {
            address,
            size,
            type_name: None,
            value: None,
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_value(mut self, value: Vec<u8>) -> Self {
        self.value = Some(value);
        self
    }
}

impl fmt::Display for DataItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Data {} ({} bytes, {})",
            self.address,
            self.size,
            self.type_name.as_deref().unwrap_or("untyped")
        )
    }
}
