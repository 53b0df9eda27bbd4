//! Export orchestration.
//!
//! An `Exporter` drives one run of the pipeline:
//! `Idle -> AwaitingStability -> Snapshotting -> Canonicalizing ->
//! Emitting -> Done`, with `Failed(kind)` reachable from every
//! non-terminal state. It is single-use; a second run reports
//! `AlreadyRun` without touching the state.
//!
//! The gate wait is the only await point. Dropping the returned future
//! before it resolves cancels the export without creating any output.
//! The output file is only created once emission starts, so a run that
//! fails earlier leaves nothing on disk, and a run that fails while
//! emitting leaves a file without its closing root tag.

use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span};

use crate::analysis::engine::AnalysisEngine;
use crate::analysis::gate::AnalysisGate;
use crate::analysis::snapshot::DatabaseModel;
use crate::error::{ExportError, ExportErrorKind, Result};
use crate::export::canonical::{canonical_order, CanonicalExport, SectionCounts};
use crate::export::config::ExportOptions;
use crate::export::xml::XmlEmitter;
use crate::log_error;

/// Lifecycle of an [`Exporter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Idle,
    AwaitingStability,
    Snapshotting,
    Canonicalizing,
    Emitting,
    Done,
    /// Failed with the classification of the originating error
    Failed(ExportErrorKind),
}

impl ExportState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportState::Done | ExportState::Failed(_))
    }
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportState::Idle => write!(f, "idle"),
            ExportState::AwaitingStability => write!(f, "awaiting-stability"),
            ExportState::Snapshotting => write!(f, "snapshotting"),
            ExportState::Canonicalizing => write!(f, "canonicalizing"),
            ExportState::Emitting => write!(f, "emitting"),
            ExportState::Done => write!(f, "done"),
            ExportState::Failed(kind) => write!(f, "failed({})", kind),
        }
    }
}

/// Result of a successful export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSummary {
    /// Output path, when exporting to a file
    pub path: Option<PathBuf>,
    pub counts: SectionCounts,
    pub bytes_written: u64,
    pub elapsed: Duration,
}

/// Output destination, opened lazily when emission begins.
enum Sink<'a, W: Write> {
    File(&'a Path),
    Writer(W),
}

struct CountingWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Single-use driver of the export pipeline.
pub struct Exporter<'e, E: ?Sized> {
    engine: &'e E,
    options: ExportOptions,
    state: ExportState,
}

impl<'e, E> Exporter<'e, E>
where
    E: AnalysisEngine + ?Sized,
{
    pub fn new(engine: &'e E, options: ExportOptions) -> Self {
        Self {
            engine,
            options,
            state: ExportState::Idle,
        }
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export to a file at `path`.
    pub async fn export_database(&mut self, path: impl AsRef<Path>) -> Result<ExportSummary> {
        let path = path.as_ref();
        let mut summary = self.run(Sink::<File>::File(path)).await?;
        summary.path = Some(path.to_path_buf());
        Ok(summary)
    }

    /// Export to an arbitrary writer.
    pub async fn export_to_writer<W: Write>(&mut self, writer: W) -> Result<ExportSummary> {
        self.run(Sink::Writer(writer)).await
    }

    fn transition(&mut self, next: ExportState) {
        debug!(from = %self.state, to = %next, "Exporter transition");
        self.state = next;
        info!(state = %next, "Export state");
    }

    fn fail(&mut self, err: ExportError) -> ExportError {
        let stage = self.state.to_string();
        let err = log_error!(err, stage.as_str());
        self.state = ExportState::Failed(err.kind());
        err
    }

    async fn run<W: Write>(&mut self, sink: Sink<'_, W>) -> Result<ExportSummary> {
        if self.state != ExportState::Idle {
            return Err(ExportError::AlreadyRun);
        }
        let started = Instant::now();

        self.transition(ExportState::AwaitingStability);
        let gate = AnalysisGate::new(self.engine, self.options.gate.clone());
        let token = match gate.wait_with_deadline().await {
            Ok(token) => token,
            Err(e) => return Err(self.fail(e)),
        };

        let span = info_span!("export", width = %self.options.address_width);
        let _guard = span.enter();

        self.transition(ExportState::Snapshotting);
        let model = DatabaseModel::snapshot(self.engine, &token);

        self.transition(ExportState::Canonicalizing);
        let export = match canonical_order(&model, &self.options) {
            Ok(export) => export,
            Err(e) => return Err(self.fail(e)),
        };
        let counts = export.counts();
        info!(
            segments = counts.segments,
            entry_points = counts.entry_points,
            types = counts.types,
            functions = counts.functions,
            instructions = counts.instructions,
            data_items = counts.data_items,
            symbols = counts.symbols,
            cross_references = counts.cross_references,
            "Section counts"
        );

        self.transition(ExportState::Emitting);
        let written = match sink {
            Sink::File(path) => File::create(path)
                .map_err(ExportError::from)
                .and_then(|file| emit_counted(BufWriter::new(file), &export, &self.options)),
            Sink::Writer(writer) => emit_counted(writer, &export, &self.options),
        };
        let bytes_written = match written {
            Ok(n) => n,
            Err(e) => return Err(self.fail(e)),
        };

        self.transition(ExportState::Done);
        let elapsed = started.elapsed();
        info!(bytes_written, ?elapsed, "Export complete");
        Ok(ExportSummary {
            path: None,
            counts,
            bytes_written,
            elapsed,
        })
    }
}

fn emit_counted<W: Write>(
    writer: W,
    export: &CanonicalExport<'_>,
    options: &ExportOptions,
) -> Result<u64> {
    let counting = CountingWriter {
        inner: writer,
        written: 0,
    };
    let mut emitter = XmlEmitter::new(counting, options.address_width);
    emitter.emit(export.records())?;
    Ok(emitter.into_inner().written)
}

/// Export everything `engine` knows to `path` with a fresh [`Exporter`].
pub async fn export_database<E>(
    engine: &E,
    path: impl AsRef<Path>,
    options: ExportOptions,
) -> Result<ExportSummary>
where
    E: AnalysisEngine + ?Sized,
{
    Exporter::new(engine, options).export_database(path).await
}
