//! Error types for the dbxml export pipeline.
//!
//! Every stage either produces a complete result or returns one of these
//! typed failures; there is no best-effort mode. `ExportErrorKind` is the
//! flat classification carried by a failed exporter so callers can tell
//! an unstable analysis from a data integrity problem from an I/O fault.

use std::fmt;
use thiserror::Error;

use crate::core::address::Address;

/// Main error type for export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Analysis never reached quiescence (deadline elapsed or wait aborted)
    #[error("Analysis incomplete: {reason}")]
    IncompleteAnalysis { reason: String },

    /// A type reference is missing, duplicated or part of a containment cycle
    #[error("Unresolved type '{name}'{}: {reason}", fmt_at(.address))]
    UnresolvedType {
        name: String,
        address: Option<Address>,
        reason: String,
    },

    /// An address-bearing entity points outside every segment
    #[error("Unresolved reference at {address}: {reason}")]
    UnresolvedReference { address: Address, reason: String },

    /// A structural invariant of the model does not hold
    #[error("Invariant violated at {address}: {reason}")]
    InvariantViolation { address: Address, reason: String },

    /// File or stream failure while writing the export
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML writer failure, classified as I/O
    #[error("XML write error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The exporter already ran; retries start from a fresh exporter
    #[error("Exporter already ran; create a new exporter to retry")]
    AlreadyRun,
}

fn fmt_at(address: &Option<Address>) -> String {
    address.map(|a| format!(" at {a}")).unwrap_or_default()
}

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// Flat classification of an [`ExportError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportErrorKind {
    IncompleteAnalysis,
    UnresolvedType,
    UnresolvedReference,
    InvariantViolation,
    Io,
    AlreadyRun,
}

impl ExportError {
    pub fn kind(&self) -> ExportErrorKind {
        match self {
            ExportError::IncompleteAnalysis { .. } => ExportErrorKind::IncompleteAnalysis,
            ExportError::UnresolvedType { .. } => ExportErrorKind::UnresolvedType,
            ExportError::UnresolvedReference { .. } => ExportErrorKind::UnresolvedReference,
            ExportError::InvariantViolation { .. } => ExportErrorKind::InvariantViolation,
            ExportError::Io(_) | ExportError::Xml(_) => ExportErrorKind::Io,
            ExportError::AlreadyRun => ExportErrorKind::AlreadyRun,
        }
    }

    pub(crate) fn invariant(address: Address, reason: impl Into<String>) -> Self {
        ExportError::InvariantViolation {
            address,
            reason: reason.into(),
        }
    }

    pub(crate) fn unresolved(address: Address, reason: impl Into<String>) -> Self {
        ExportError::UnresolvedReference {
            address,
            reason: reason.into(),
        }
    }

    pub(crate) fn unresolved_type(
        name: impl Into<String>,
        address: Option<Address>,
        reason: impl Into<String>,
    ) -> Self {
        ExportError::UnresolvedType {
            name: name.into(),
            address,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ExportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExportErrorKind::IncompleteAnalysis => "incomplete-analysis",
            ExportErrorKind::UnresolvedType => "unresolved-type",
            ExportErrorKind::UnresolvedReference => "unresolved-reference",
            ExportErrorKind::InvariantViolation => "invariant-violation",
            ExportErrorKind::Io => "io",
            ExportErrorKind::AlreadyRun => "already-run",
        };
        write!(f, "{}", s)
    }
}
