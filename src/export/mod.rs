//! Downstream side of the pipeline: canonical ordering, XML emission,
//! orchestration, and the reverse import used for round-trips.

pub mod canonical;
pub mod config;
pub mod exporter;
pub mod import;
pub mod xml;

pub use canonical::{canonical_order, CanonicalExport, ExportRecord, SectionCounts};
pub use config::{ExportOptions, Section, SectionSet};
pub use exporter::{export_database, ExportState, ExportSummary, Exporter};
pub use import::{import_database, import_from_str, DocumentHeader, ImportError, ImportedDatabase};
pub use xml::{render_to_string, XmlEmitter, ROOT_TAG, SCHEMA_VERSION};
