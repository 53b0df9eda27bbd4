//! Configuration for the export pipeline.
//!
//! `ExportOptions` is the only knob set the core accepts: address width,
//! per-section inclusion, optional symbol demangling and the gate's
//! polling parameters. It round-trips through JSON so drivers can keep
//! it in a file.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analysis::gate::GateConfig;
use crate::core::address::AddressWidth;

/// Major sections of the interchange document, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Segments,
    EntryPoints,
    Types,
    Functions,
    Data,
    Symbols,
    CrossReferences,
}

impl Section {
    /// All sections in the fixed document order.
    pub const ALL: [Section; 7] = [
        Section::Segments,
        Section::EntryPoints,
        Section::Types,
        Section::Functions,
        Section::Data,
        Section::Symbols,
        Section::CrossReferences,
    ];

    /// XML element name of the section.
    pub fn tag(&self) -> &'static str {
        match self {
            Section::Segments => "segments",
            Section::EntryPoints => "entry-points",
            Section::Types => "types",
            Section::Functions => "functions",
            Section::Data => "data",
            Section::Symbols => "symbols",
            Section::CrossReferences => "cross-references",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Section::ALL.into_iter().find(|s| s.tag() == tag)
    }

    pub fn flag(&self) -> SectionSet {
        match self {
            Section::Segments => SectionSet::SEGMENTS,
            Section::EntryPoints => SectionSet::ENTRY_POINTS,
            Section::Types => SectionSet::TYPES,
            Section::Functions => SectionSet::FUNCTIONS,
            Section::Data => SectionSet::DATA,
            Section::Symbols => SectionSet::SYMBOLS,
            Section::CrossReferences => SectionSet::CROSS_REFERENCES,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

bitflags! {
    /// Set of sections to include in an export
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SectionSet: u8 {
        const SEGMENTS = 1 << 0;
        const ENTRY_POINTS = 1 << 1;
        const TYPES = 1 << 2;
        const FUNCTIONS = 1 << 3;
        const DATA = 1 << 4;
        const SYMBOLS = 1 << 5;
        const CROSS_REFERENCES = 1 << 6;
    }
}

impl SectionSet {
    pub fn includes(&self, section: Section) -> bool {
        self.contains(section.flag())
    }

    pub fn without(self, section: Section) -> Self {
        self - section.flag()
    }
}

impl Default for SectionSet {
    fn default() -> Self {
        SectionSet::all()
    }
}

/// Master configuration for an export run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Word size used to render addresses
    pub address_width: AddressWidth,
    /// Sections written to the document
    pub sections: SectionSet,
    /// Fill missing demangled symbol names
    pub demangle_symbols: bool,
    /// Analysis gate polling
    pub gate: GateConfig,
}

impl ExportOptions {
    pub fn with_address_width(mut self, width: AddressWidth) -> Self {
        self.address_width = width;
        self
    }

    pub fn without_section(mut self, section: Section) -> Self {
        self.sections = self.sections.without(section);
        self
    }

    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Parse options, using `fallback` when the JSON names no address width.
    pub fn from_json_str_or_width(json: &str, fallback: AddressWidth) -> serde_json::Result<Self> {
        let file: OptionsFile = serde_json::from_str(json)?;
        Ok(ExportOptions {
            address_width: file.address_width.unwrap_or(fallback),
            sections: file.sections,
            demangle_symbols: file.demangle_symbols,
            gate: file.gate,
        })
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// On-disk options where an absent width stays distinguishable from the default.
#[derive(Default, Deserialize)]
#[serde(default)]
struct OptionsFile {
    address_width: Option<AddressWidth>,
    sections: SectionSet,
    demangle_symbols: bool,
    gate: GateConfig,
}
