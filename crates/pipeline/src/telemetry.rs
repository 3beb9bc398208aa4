//! Telemetry initialisation for the pipeline binary.
//!
//! Lightweight setup: structured JSON logs only. The tool runs as a local
//! batch process, so there is no exporter pipeline to wire up.
//!
//! # Telemetry invariants
//!
//! - **No token plaintext or key material** must appear in any log field.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`).

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Initialise the tracing subscriber.
///
/// Outputs structured JSON logs to stdout at the configured log level.
///
/// # Errors
///
/// Returns an error if the subscriber has already been set.
pub fn init(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise tracing subscriber: {e}"))
}
