//! Demangler helpers for Rust, C++ (Itanium) and MSVC symbols.
//!
//! Used by the canonicalizer to fill in a missing demangled form when
//! `demangle_symbols` is enabled. A name that no demangler accepts is
//! left alone.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_ITA_MANGLED: Lazy<Regex> = Lazy::new(|| {
    // Itanium (GCC/Clang) ABI: _Z...
    Regex::new(r#"^_{1,2}Z[a-zA-Z0-9_]+$"#).expect("valid itanium mangled regex")
});

static RE_MSVC_MANGLED: Lazy<Regex> = Lazy::new(|| {
    // MSVC: ?name@@... or ??0...
    Regex::new(r#"^\?\??[A-Za-z0-9_@\$\?]+@@[A-Za-z0-9_@\$\?]+$"#)
        .expect("valid msvc mangled regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolFlavor {
    Rust,
    Itanium,
    Msvc,
    Unknown,
}

pub fn detect_flavor(s: &str) -> SymbolFlavor {
    if rustc_demangle::try_demangle(s).is_ok() {
        return SymbolFlavor::Rust;
    }
    if RE_ITA_MANGLED.is_match(s) {
        return SymbolFlavor::Itanium;
    }
    if RE_MSVC_MANGLED.is_match(s) {
        return SymbolFlavor::Msvc;
    }
    SymbolFlavor::Unknown
}

/// Attempt to demangle a single symbol. Returns None when not recognized.
pub fn demangle(s: &str) -> Option<String> {
    match detect_flavor(s) {
        SymbolFlavor::Rust => rustc_demangle::try_demangle(s)
            .ok()
            .map(|dm| format!("{:#}", dm)),
        SymbolFlavor::Itanium => cpp_demangle::Symbol::new(s).ok().map(|sym| sym.to_string()),
        SymbolFlavor::Msvc => {
            msvc_demangler::demangle(s, msvc_demangler::DemangleFlags::COMPLETE).ok()
        }
        SymbolFlavor::Unknown => None,
    }
}
