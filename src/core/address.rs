//! Address types for the analysis database.
//!
//! This module provides the `Address` newtype used for every location in
//! the model and the `AddressWidth` selector that fixes how addresses are
//! rendered in the interchange format.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;

/// A virtual address in the analyzed program.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Address(pub u64);

impl Address {
    /// Numeric value of the address.
    pub fn value(self) -> u64 {
        self.0
    }

    /// Address `delta` bytes further on, or `None` on overflow.
    pub fn checked_add(self, delta: u64) -> Option<Address> {
        self.0.checked_add(delta).map(Address)
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Address(value)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Architecture word size used when rendering addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AddressWidth {
    /// 32-bit addresses, rendered with 8 hex digits
    Bits32,
    /// 64-bit addresses, rendered with 16 hex digits
    #[default]
    Bits64,
}

impl AddressWidth {
    pub fn bits(self) -> u8 {
        match self {
            AddressWidth::Bits32 => 32,
            AddressWidth::Bits64 => 64,
        }
    }

    /// Number of hex digits an address occupies at this width.
    pub fn hex_digits(self) -> usize {
        usize::from(self.bits() / 4)
    }

    /// Largest address representable at this width.
    pub fn max_address(self) -> u64 {
        match self {
            AddressWidth::Bits32 => u64::from(u32::MAX),
            AddressWidth::Bits64 => u64::MAX,
        }
    }

    pub fn fits(self, address: Address) -> bool {
        address.0 <= self.max_address()
    }

    /// Whether an exclusive end bound fits: one past the last address is allowed.
    pub fn fits_end(self, end: Address) -> bool {
        end.0 <= self.max_address().saturating_add(1)
    }

    /// Render an address as `0x` + zero-padded lowercase hex.
    ///
    /// Returns `None` when the address does not fit the width.
    pub fn format(self, address: Address) -> Option<String> {
        if !self.fits(address) {
            return None;
        }
        Some(format!(
            "0x{:0width$x}",
            address.0,
            width = self.hex_digits()
        ))
    }

    /// Render an exclusive end bound.
    ///
    /// At 32 bits the end of the address space is written as `0x100000000`.
    pub fn format_end(self, end: Address) -> Option<String> {
        if !self.fits_end(end) {
            return None;
        }
        Some(format!("0x{:0width$x}", end.0, width = self.hex_digits()))
    }
}

impl TryFrom<u8> for AddressWidth {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            32 => Ok(AddressWidth::Bits32),
            64 => Ok(AddressWidth::Bits64),
            other => Err(format!("address width must be 32 or 64, got {}", other)),
        }
    }
}

impl From<AddressWidth> for u8 {
    fn from(width: AddressWidth) -> Self {
        width.bits()
    }
}

impl fmt::Display for AddressWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// Render a size, length, offset or count as minimal `0x` lowercase hex.
pub fn format_size(value: u64) -> String {
    format!("{:#x}", value)
}

/// Parse a `0x`-prefixed (or bare) hexadecimal number.
///
/// A sign is rejected: the exporter never writes one.
pub fn parse_hex(text: &str) -> Result<u64, ParseIntError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    if digits.starts_with(['+', '-']) {
        // Route through the parser so the error stays a ParseIntError.
        return u64::from_str_radix("", 16);
    }
    u64::from_str_radix(digits, 16)
}
