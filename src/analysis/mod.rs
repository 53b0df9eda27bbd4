//! Upstream side of the export pipeline.
//!
//! This module holds the `AnalysisEngine` capability trait the exporter
//! consumes, the `AnalysisGate` that waits for the engine to settle, and
//! the immutable `DatabaseModel` snapshot taken once it has.

pub mod engine;
pub mod gate;
pub mod snapshot;

pub use engine::{AnalysisEngine, QuiescenceCallback, StaticEngine};
pub use gate::{AnalysisGate, GateConfig, StabilityToken};
pub use snapshot::{DatabaseModel, ModelBuilder};
