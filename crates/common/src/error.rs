//! Fatal, batch-level error types shared across crates.

use thiserror::Error;

/// Top-level fatal pipeline error.
///
/// Row-scoped decode failures are *not* errors: they become
/// [`DecryptionOutcome`](crate::outcome::DecryptionOutcome) values attached to
/// the affected row, and the batch keeps going. The variants here abort (or
/// refuse) an entire pipeline stage and are surfaced to the caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The upstream record source produced a malformed record or failed mid-read.
    #[error("input source failed: {0}")]
    InputSource(String),

    /// Serialising or writing the export artifact failed.
    #[error("export write failed: {0}")]
    ExportWrite(String),

    /// The requested export path cannot handle this many rows.
    #[error("spreadsheet export unavailable for {rows} rows (limit {limit}); use the CSV export")]
    ExportCapabilityUnavailable { rows: usize, limit: usize },

    /// The run was cancelled at a slice or chunk boundary.
    #[error("cancelled")]
    Cancelled,

    /// The configured voucher key does not have the expected byte length.
    #[error("invalid voucher key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    /// A pipeline stage was invoked out of order.
    #[error("invalid pipeline transition: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

impl PipelineError {
    /// The pipeline stage this error is attributed to, for caller-facing
    /// messages ("export failed while …").
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::InputSource(_) => "input",
            PipelineError::ExportWrite(_) => "export",
            PipelineError::ExportCapabilityUnavailable { .. } => "export",
            PipelineError::Cancelled => "cancellation",
            PipelineError::InvalidKeyLength { .. } => "startup",
            PipelineError::InvalidTransition { .. } => "control",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages() {
        assert_eq!(PipelineError::InputSource("x".into()).stage(), "input");
        assert_eq!(
            PipelineError::ExportCapabilityUnavailable {
                rows: 100_001,
                limit: 80_000
            }
            .stage(),
            "export"
        );
        assert_eq!(PipelineError::Cancelled.stage(), "cancellation");
    }

    #[test]
    fn display_includes_context() {
        let e = PipelineError::ExportCapabilityUnavailable {
            rows: 100_001,
            limit: 80_000,
        };
        let msg = e.to_string();
        assert!(msg.contains("100001"));
        assert!(msg.contains("80000"));
        assert!(msg.contains("CSV"));
    }

    #[test]
    fn key_length_reports_both_sizes() {
        let e = PipelineError::InvalidKeyLength {
            expected: 16,
            got: 12,
        };
        assert!(e.to_string().contains("expected 16"));
        assert!(e.to_string().contains("got 12"));
    }
}
