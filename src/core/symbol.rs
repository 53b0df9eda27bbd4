//! Symbol type for named program entities.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::address::Address;

/// Symbol visibility (binding) levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Visibility {
    /// Local symbol
    Local,
    /// Global symbol
    Global,
    /// Weak symbol
    Weak,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Local => "local",
            Visibility::Global => "global",
            Visibility::Weak => "weak",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        Some(match text {
            "local" => Visibility::Local,
            "global" => Visibility::Global,
            "weak" => Visibility::Weak,
            _ => return None,
        })
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named address
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub address: Address,
    /// Mangled/exported name
    pub name: String,
    pub visibility: Visibility,
    /// Demangled name (optional)
    pub demangled: Option<String>,
}

impl Symbol {
    pub fn new(address: Address, name: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            address,
            name: name.into(),
            visibility,
            demangled: None,
        }
    }

    pub fn with_demangled(mut self, demangled: impl Into<String>) -> Self {
        self.demangled = Some(demangled.into());
        self
    }

    /// Get the display name (demangled if available, otherwise mangled)
    pub fn display_name(&self) -> &str {
        self.demangled.as_deref().unwrap_or(&self.name)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Symbol '{}' ({}) at {}",
            self.display_name(),
            self.visibility,
            self.address
        )
    }
}
