//! Upstream analysis engine interface.
//!
//! The exporter treats the engine as an opaque, read-only capability: it
//! can ask whether the work queue is drained, subscribe to quiescence
//! notifications, and list every entity kind. It never mutates engine
//! state.

use crate::analysis::snapshot::DatabaseModel;
use crate::core::{
    CrossReference, DataItem, EntryPoint, Function, Segment, Symbol, TypeDef,
};

/// Callback fired by the engine whenever it believes its queue drained.
/// It may fire spuriously and more than once.
pub type QuiescenceCallback = Box<dyn Fn() + Send + Sync>;

/// Read-only view of a live analysis engine.
pub trait AnalysisEngine: Send + Sync {
    /// True when no analysis work is pending right now.
    fn is_queue_empty(&self) -> bool;

    /// Register a callback for quiescence notifications.
    fn notify_on_quiescence(&self, callback: QuiescenceCallback);

    fn list_segments(&self) -> Vec<Segment>;
    fn list_functions(&self) -> Vec<Function>;
    fn list_data_items(&self) -> Vec<DataItem>;
    fn list_types(&self) -> Vec<TypeDef>;
    fn list_symbols(&self) -> Vec<Symbol>;
    fn list_cross_references(&self) -> Vec<CrossReference>;
    fn list_entry_points(&self) -> Vec<EntryPoint>;
}

/// Engine over an already-finished model; always quiescent.
///
/// Used to re-export an imported interchange file and as a fixture.
#[derive(Debug, Clone, Default)]
pub struct StaticEngine {
    model: DatabaseModel,
}

impl StaticEngine {
    pub fn new(model: DatabaseModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &DatabaseModel {
        &self.model
    }
}

impl From<DatabaseModel> for StaticEngine {
    fn from(model: DatabaseModel) -> Self {
        Self::new(model)
    }
}

impl AnalysisEngine for StaticEngine {
    fn is_queue_empty(&self) -> bool {
        true
    }

    fn notify_on_quiescence(&self, callback: QuiescenceCallback) {
        callback();
    }

    fn list_segments(&self) -> Vec<Segment> {
        self.model.segments().to_vec()
    }

    fn list_functions(&self) -> Vec<Function> {
        self.model.functions().to_vec()
    }

    fn list_data_items(&self) -> Vec<DataItem> {
        self.model.data_items().to_vec()
    }

    fn list_types(&self) -> Vec<TypeDef> {
        self.model.types().to_vec()
    }

    fn list_symbols(&self) -> Vec<Symbol> {
        self.model.symbols().to_vec()
    }

    fn list_cross_references(&self) -> Vec<CrossReference> {
        self.model.cross_references().to_vec()
    }

    fn list_entry_points(&self) -> Vec<EntryPoint> {
        self.model.entry_points().to_vec()
    }
}
