//! AnalysisGate: wait for the upstream engine to reach quiescence.
//!
//! The engine may re-queue work triggered by its own settling, and its
//! quiescence callback can fire spuriously. The gate therefore polls
//! `is_queue_empty` and only returns once `debounce_checks` consecutive
//! polls (two by default) see an empty queue. Between busy polls it
//! suspends on either the next notification or `poll_interval_ms`,
//! whichever comes first; between quiet polls it yields. Dropping the
//! wait future cancels it.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{debug, info, trace};

use crate::analysis::engine::AnalysisEngine;
use crate::error::Result;
use crate::timeout::{with_timeout, TimeoutConfig};

/// Gate polling configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Upper bound on the sleep between busy polls
    pub poll_interval_ms: u64,
    /// Consecutive empty-queue observations required
    pub debounce_checks: u32,
    /// Optional external deadline for the whole wait
    pub deadline_ms: Option<u64>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            debounce_checks: 2,
            deadline_ms: None,
        }
    }
}

/// Proof that the gate observed quiescence.
///
/// Only the gate can create one; snapshotting requires it.
#[derive(Debug, Clone)]
pub struct StabilityToken {
    polls: u64,
    waited: Duration,
}

impl StabilityToken {
    /// Number of `is_queue_empty` polls it took to settle
    pub fn polls(&self) -> u64 {
        self.polls
    }

    pub fn waited(&self) -> Duration {
        self.waited
    }
}

/// Blocking barrier in front of the export pipeline.
pub struct AnalysisGate<'e, E: ?Sized> {
    engine: &'e E,
    config: GateConfig,
}

impl<'e, E> AnalysisGate<'e, E>
where
    E: AnalysisEngine + ?Sized,
{
    pub fn new(engine: &'e E, config: GateConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Wait until the engine is quiescent. No timeout.
    pub async fn wait_until_stable(&self) -> StabilityToken {
        let started = Instant::now();
        let notify = Arc::new(Notify::new());
        let waker = Arc::clone(&notify);
        self.engine
            .notify_on_quiescence(Box::new(move || waker.notify_one()));

        let required = self.config.debounce_checks.max(1);
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        let mut consecutive = 0u32;
        let mut polls = 0u64;

        loop {
            polls += 1;
            if self.engine.is_queue_empty() {
                consecutive += 1;
                trace!(polls, consecutive, "Queue empty");
                if consecutive >= required {
                    let waited = started.elapsed();
                    info!(polls, ?waited, "Analysis reached quiescence");
                    return StabilityToken { polls, waited };
                }
                tokio::task::yield_now().await;
            } else {
                if consecutive > 0 {
                    debug!(polls, "Engine re-queued work while settling");
                }
                consecutive = 0;
                tokio::select! {
                    _ = notify.notified() => trace!(polls, "Quiescence notification"),
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        }
    }

    /// Wait honouring `deadline_ms`, if configured.
    pub async fn wait_with_deadline(&self) -> Result<StabilityToken> {
        match self.config.deadline_ms {
            Some(ms) => {
                let config = TimeoutConfig::from_millis(ms, "analysis gate");
                with_timeout(config, async { Ok(self.wait_until_stable().await) }).await
            }
            None => Ok(self.wait_until_stable().await),
        }
    }
}
