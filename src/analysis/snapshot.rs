//! DatabaseModel: immutable snapshot of analysis results.
//!
//! A snapshot is taken exactly once per export, after the gate has
//! produced a `StabilityToken`. Nothing downstream mutates it, so the
//! canonicalizer and emitter can read it without locking. Entities are
//! copied verbatim; fields the engine left unknown stay `None`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

use crate::analysis::engine::AnalysisEngine;
use crate::analysis::gate::StabilityToken;
use crate::core::{
    CrossReference, DataItem, EntryPoint, Function, Segment, Symbol, TypeDef,
};

/// Read-only, exclusively-owned view over analysis results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseModel {
    segments: Vec<Segment>,
    functions: Vec<Function>,
    data_items: Vec<DataItem>,
    types: Vec<TypeDef>,
    symbols: Vec<Symbol>,
    cross_references: Vec<CrossReference>,
    entry_points: Vec<EntryPoint>,
}

impl DatabaseModel {
    /// Copy every entity out of a quiescent engine.
    ///
    /// The token proves the caller went through the analysis gate.
    pub fn snapshot<E>(engine: &E, token: &StabilityToken) -> Self
    where
        E: AnalysisEngine + ?Sized,
    {
        let span = info_span!("snapshot", gate_polls = token.polls());
        let _guard = span.enter();

        let model = Self {
            segments: engine.list_segments(),
            functions: engine.list_functions(),
            data_items: engine.list_data_items(),
            types: engine.list_types(),
            symbols: engine.list_symbols(),
            cross_references: engine.list_cross_references(),
            entry_points: engine.list_entry_points(),
        };
        debug!(
            segments = model.segments.len(),
            functions = model.functions.len(),
            data_items = model.data_items.len(),
            types = model.types.len(),
            symbols = model.symbols.len(),
            cross_references = model.cross_references.len(),
            entry_points = model.entry_points.len(),
            "Snapshot taken"
        );
        model
    }

    pub fn builder() -> ModelBuilder {
        ModelBuilder::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn data_items(&self) -> &[DataItem] {
        &self.data_items
    }

    pub fn types(&self) -> &[TypeDef] {
        &self.types
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn cross_references(&self) -> &[CrossReference] {
        &self.cross_references
    }

    pub fn entry_points(&self) -> &[EntryPoint] {
        &self.entry_points
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
            && self.functions.is_empty()
            && self.data_items.is_empty()
            && self.types.is_empty()
            && self.symbols.is_empty()
            && self.cross_references.is_empty()
            && self.entry_points.is_empty()
    }
}

/// Builder for DatabaseModel.
///
/// Used by the importer and by tests; live engines go through
/// [`DatabaseModel::snapshot`].
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    model: DatabaseModel,
}

impl ModelBuilder {
    pub fn segment(mut self, segment: Segment) -> Self {
        self.model.segments.push(segment);
        self
    }

    pub fn function(mut self, function: Function) -> Self {
        self.model.functions.push(function);
        self
    }

    pub fn data_item(mut self, item: DataItem) -> Self {
        self.model.data_items.push(item);
        self
    }

    pub fn type_def(mut self, type_def: TypeDef) -> Self {
        self.model.types.push(type_def);
        self
    }

    pub fn symbol(mut self, symbol: Symbol) -> Self {
        self.model.symbols.push(symbol);
        self
    }

    pub fn cross_reference(mut self, xref: CrossReference) -> Self {
        self.model.cross_references.push(xref);
        self
    }

    pub fn entry_point(mut self, entry: EntryPoint) -> Self {
        self.model.entry_points.push(entry);
        self
    }

    pub(crate) fn push_segment(&mut self, segment: Segment) {
        self.model.segments.push(segment);
    }

    pub(crate) fn push_function(&mut self, function: Function) {
        self.model.functions.push(function);
    }

    pub(crate) fn push_data_item(&mut self, item: DataItem) {
        self.model.data_items.push(item);
    }

    pub(crate) fn push_type(&mut self, type_def: TypeDef) {
        self.model.types.push(type_def);
    }

    pub(crate) fn push_symbol(&mut self, symbol: Symbol) {
        self.model.symbols.push(symbol);
    }

    pub(crate) fn push_cross_reference(&mut self, xref: CrossReference) {
        self.model.cross_references.push(xref);
    }

    pub(crate) fn push_entry_point(&mut self, entry: EntryPoint) {
        self.model.entry_points.push(entry);
    }

    pub fn build(self) -> DatabaseModel {
        self.model
    }
}
