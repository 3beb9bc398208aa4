//! Pipeline session: phase tracking, cancellation, and stage orchestration.
//!
//! One upload is one session, processed by a single logical pipeline; no
//! state is shared across concurrent uploads. Stages run
//! `Idle -> Counting -> Decoding -> Ready -> Exporting -> Idle`, and any
//! active stage can drop into `Failed(reason)` on a fatal (non-row) error.
//! Rows decoded before a failure stay inspectable and exportable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use common::{AugmentedRecord, PipelineError, Record};
use tracing::warn;

use crate::batch::{BatchDecoder, DecodeStats};
use crate::config::{Config, ExportFormat};
use crate::crypto::{VoucherCodec, VoucherKey};
use crate::export::{CsvExporter, ExportArtifact, XlsxExporter};
use crate::input::CsvSource;
use crate::progress::ProgressTracker;

/// Cooperative cancellation flag, checked at slice and chunk boundaries.
///
/// Cheaply cloneable; hand a clone to whatever task owns the cancel signal.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the next boundary check.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// `true` once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Where a session currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelinePhase {
    /// Nothing running. Also the landing state after a finished export or an
    /// acknowledged failure.
    Idle,
    /// The pre-count pass has run; decoding has not started yet.
    Counting,
    /// The batch decode is in flight.
    Decoding,
    /// Decoding finished; rows await export.
    Ready,
    /// An export is in flight.
    Exporting,
    /// A fatal, non-row error occurred. Rows produced so far are kept.
    Failed(String),
}

impl PipelinePhase {
    fn name(&self) -> &'static str {
        match self {
            PipelinePhase::Idle => "idle",
            PipelinePhase::Counting => "counting",
            PipelinePhase::Decoding => "decoding",
            PipelinePhase::Ready => "ready",
            PipelinePhase::Exporting => "exporting",
            PipelinePhase::Failed(_) => "failed",
        }
    }
}

/// One upload's decode-and-export session.
pub struct Pipeline {
    decoder: BatchDecoder,
    csv: CsvExporter,
    xlsx: XlsxExporter,
    progress: ProgressTracker,
    cancel: CancelFlag,
    phase: PipelinePhase,
    rows: Vec<AugmentedRecord>,
}

impl Pipeline {
    /// Build a session around the fixed key and the configured sizes.
    pub fn new(key: VoucherKey, cfg: &Config) -> Self {
        Self {
            decoder: BatchDecoder::new(VoucherCodec::new(key), cfg.slice_size),
            csv: CsvExporter::new(cfg.export_chunk_rows),
            xlsx: XlsxExporter::new(cfg.xlsx_row_limit, cfg.xlsx_cell_limit),
            progress: ProgressTracker::new(),
            cancel: CancelFlag::new(),
            phase: PipelinePhase::Idle,
            rows: Vec::new(),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> &PipelinePhase {
        &self.phase
    }

    /// Progress counters for polling or subscription.
    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// A clone of the session's cancellation flag.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Rows decoded so far, in input order. Populated even after a failure.
    pub fn rows(&self) -> &[AugmentedRecord] {
        &self.rows
    }

    /// Two-pass pre-count: populate the progress total without decoding.
    ///
    /// Skipping this stage leaves the total unknown (single-pass mode), which
    /// is reported distinctly from a known-empty input.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InputSource`] if the source cannot be read,
    /// or [`PipelineError::InvalidTransition`] when called outside `Idle`.
    pub async fn count(&mut self, source: &CsvSource) -> Result<usize, PipelineError> {
        self.transition(&["idle"], PipelinePhase::Counting)?;
        match source.count_rows() {
            Ok(total) => {
                self.progress.set_total(total);
                Ok(total)
            }
            Err(e) => self.fail(PipelineError::InputSource(e.to_string())),
        }
    }

    /// Decode the batch, augmenting every record.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InputSource`] on a source failure,
    /// [`PipelineError::Cancelled`] when cancelled, or
    /// [`PipelineError::InvalidTransition`] when called outside
    /// `Idle`/`Counting`. On failure the session parks in `Failed` and the
    /// rows decoded so far remain available via [`Pipeline::rows`].
    pub async fn decode<I, E>(&mut self, records: I) -> Result<DecodeStats, PipelineError>
    where
        I: IntoIterator<Item = Result<Record, E>>,
        E: std::fmt::Display,
    {
        self.transition(&["idle", "counting"], PipelinePhase::Decoding)?;
        let result = self
            .decoder
            .decode_into(records, &mut self.rows, &self.progress, &self.cancel)
            .await;
        match result {
            Ok(stats) => {
                self.phase = PipelinePhase::Ready;
                Ok(stats)
            }
            Err(e) => self.fail(e),
        }
    }

    /// Export the decoded rows as the requested artifact.
    ///
    /// Allowed from `Ready`, and from `Idle` so a batch can be re-exported
    /// (or exported through the other path after an acknowledged failure).
    ///
    /// # Errors
    ///
    /// Returns the exporter's error; the session parks in `Failed` with the
    /// rows untouched.
    pub async fn export(&mut self, format: ExportFormat) -> Result<ExportArtifact, PipelineError> {
        self.transition(&["ready", "idle"], PipelinePhase::Exporting)?;
        let result = match format {
            ExportFormat::Csv => self.csv.export(&self.rows, &self.cancel).await,
            ExportFormat::Xlsx => self.xlsx.export(&self.rows, &self.cancel).await,
        };
        match result {
            Ok(artifact) => {
                self.phase = PipelinePhase::Idle;
                Ok(artifact)
            }
            Err(e) => self.fail(e),
        }
    }

    /// Acknowledge a failure, returning the session to `Idle`. No-op in any
    /// other phase. Rows are kept either way.
    pub fn acknowledge(&mut self) {
        if matches!(self.phase, PipelinePhase::Failed(_)) {
            self.phase = PipelinePhase::Idle;
        }
    }

    /// Enter `to` if the current phase is one of `from`, else refuse without
    /// touching the session.
    fn transition(
        &mut self,
        from: &[&'static str],
        to: PipelinePhase,
    ) -> Result<(), PipelineError> {
        if from.contains(&self.phase.name()) {
            self.phase = to;
            Ok(())
        } else {
            Err(PipelineError::InvalidTransition {
                from: self.phase.name(),
                to: to.name(),
            })
        }
    }

    /// Park the session in `Failed` and hand the error back to the caller.
    fn fail<T>(&mut self, error: PipelineError) -> Result<T, PipelineError> {
        warn!(stage = error.stage(), error = %error, "pipeline stage failed");
        self.phase = PipelinePhase::Failed(error.to_string());
        Err(error)
    }
}
