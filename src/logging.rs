//! Logging and tracing setup for dbxml.
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! driver's job. These helpers install one with an `EnvFilter` read from
//! `RUST_LOG` (falling back to the given default directive).

use std::sync::Once;
use tracing::info;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

static INIT: Once = Once::new();

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Initialize the global tracing subscriber with human-readable output.
///
/// Only the first call has an effect; a subscriber installed elsewhere
/// beforehand is left in place.
pub fn init_tracing() {
    init_with(LogFormat::Text, "info");
}

/// Initialize the global tracing subscriber with JSON lines.
pub fn init_tracing_json() {
    init_with(LogFormat::Json, "info");
}

/// Initialize tracing in `format`, filtering with `default_directive`
/// unless `RUST_LOG` is set.
pub fn init_with(format: LogFormat, default_directive: &str) {
    INIT.call_once(|| {
        let filter = env_filter(default_directive);
        let installed = match format {
            LogFormat::Text => tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_span_events(FmtSpan::CLOSE)
                        .with_target(true)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
            LogFormat::Json => tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_span_events(FmtSpan::CLOSE)
                        .with_target(true)
                        .with_current_span(true)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
        };
        if installed.is_ok() {
            info!(?format, "dbxml tracing initialized");
        }
    });
}

/// Log an error at `error` level and hand it back.
#[macro_export]
macro_rules! log_error {
    ($err:expr) => {{
        let e = $err;
        tracing::error!(error = %e, "Operation failed");
        e
    }};
    ($err:expr, $msg:expr) => {{
        let e = $err;
        tracing::error!(error = %e, message = $msg, "Operation failed");
        e
    }};
}
