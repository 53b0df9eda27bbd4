//! dbxml: deterministic XML interchange for binary-analysis databases.
//!
//! The pipeline waits for an [`AnalysisEngine`] to settle, snapshots it
//! into an immutable [`DatabaseModel`], orders and validates the snapshot,
//! and streams it as a single XML document that [`import_database`] can
//! read back.

pub mod analysis;
pub mod core;
pub mod demangle;
pub mod error;
pub mod export;
pub mod logging;
pub mod timeout;

pub use analysis::{AnalysisEngine, AnalysisGate, DatabaseModel, StabilityToken, StaticEngine};
pub use error::{ExportError, ExportErrorKind, Result};
pub use export::{
    export_database, import_database, import_from_str, ExportOptions, ExportState,
    ExportSummary, Exporter, ImportError, ImportedDatabase, Section,
};
