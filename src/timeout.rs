//! Deadline utilities for the analysis gate.
//!
//! The gate has no timeout of its own. Callers that cannot wait forever
//! wrap the wait in a deadline; an elapsed deadline means the analysis
//! never reached quiescence, so it surfaces as `IncompleteAnalysis`.

use crate::error::{ExportError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error};

/// Timeout configuration for an awaited operation
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Maximum duration for the operation
    pub duration: Duration,
    /// Whether to log an error when the deadline elapses
    pub log_warnings: bool,
    /// Operation name for logging
    pub operation_name: String,
}

impl TimeoutConfig {
    pub fn new(duration: Duration, operation: impl Into<String>) -> Self {
        Self {
            duration,
            log_warnings: true,
            operation_name: operation.into(),
        }
    }

    pub fn from_millis(millis: u64, operation: impl Into<String>) -> Self {
        Self::new(Duration::from_millis(millis), operation)
    }
}

/// Execute an async operation with a deadline
pub async fn with_timeout<T, F>(config: TimeoutConfig, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    debug!(
        "Starting operation '{}' with deadline of {:?}",
        config.operation_name, config.duration
    );

    match timeout(config.duration, future).await {
        Ok(result) => result,
        Err(_) => {
            let reason = format!(
                "operation '{}' did not finish within {:?}",
                config.operation_name, config.duration
            );
            if config.log_warnings {
                error!("{}", reason);
            }
            Err(ExportError::IncompleteAnalysis { reason })
        }
    }
}
