//! Batch decoding: drives the codec over an ordered record sequence.
//!
//! Rows are processed in slices with a yield point between slices, so a
//! responsive host can repaint, report progress, or cancel. A bad row never
//! aborts the batch; only a failure of the record source itself does.

use common::{AugmentedRecord, DecryptionOutcome, PipelineError, Record};
use tracing::debug;

use crate::crypto::VoucherCodec;
use crate::pipeline::CancelFlag;
use crate::progress::ProgressTracker;

/// Canonical (lower-cased) name of the token-bearing column.
const CODE_COLUMN: &str = "code";

/// Literal fallback key when no case-insensitive match exists.
const CODE_FALLBACK: &str = "Code";

/// The resolved token column for one batch's record shape.
///
/// Resolution runs once against the first record, not per row and not per
/// codec call.
#[derive(Debug, Clone)]
pub struct CodeColumn(String);

impl CodeColumn {
    /// First column whose lowercase name is `"code"`, falling back to the
    /// literal `"Code"` (which simply yields absent values if no such column
    /// exists).
    pub fn resolve(record: &Record) -> Self {
        let name = record
            .columns()
            .find(|column| column.to_lowercase() == CODE_COLUMN)
            .unwrap_or(CODE_FALLBACK);
        Self(name.to_string())
    }

    /// The raw token value for a row; absent cells read as empty.
    pub fn raw_value<'a>(&self, record: &'a Record) -> &'a str {
        record.get(&self.0).unwrap_or("")
    }

    /// The resolved column name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Totals for one decoded batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeStats {
    /// Rows decoded (successfully or not).
    pub decoded: usize,
    /// Rows whose outcome was anything other than a recovered plaintext.
    pub failed: usize,
}

/// Drives [`VoucherCodec`] over an ordered sequence of records.
pub struct BatchDecoder {
    codec: VoucherCodec,
    slice_size: usize,
}

impl BatchDecoder {
    /// Build a decoder processing `slice_size` records between yield points.
    pub fn new(codec: VoucherCodec, slice_size: usize) -> Self {
        Self {
            codec,
            slice_size: slice_size.max(1),
        }
    }

    /// Decode every record into `out`, preserving input order.
    ///
    /// On cancellation or a source failure, rows already pushed into `out`
    /// are kept so the caller can still inspect or export them.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InputSource`] if the source yields an error,
    /// or [`PipelineError::Cancelled`] when the flag is set at a slice
    /// boundary.
    pub async fn decode_into<I, E>(
        &self,
        records: I,
        out: &mut Vec<AugmentedRecord>,
        progress: &ProgressTracker,
        cancel: &CancelFlag,
    ) -> Result<DecodeStats, PipelineError>
    where
        I: IntoIterator<Item = Result<Record, E>>,
        E: std::fmt::Display,
    {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let mut stats = DecodeStats::default();
        let mut column: Option<CodeColumn> = None;
        let mut in_slice = 0usize;

        for item in records {
            let record = item.map_err(|e| PipelineError::InputSource(e.to_string()))?;

            let column = column.get_or_insert_with(|| {
                let resolved = CodeColumn::resolve(&record);
                debug!(column = resolved.name(), "token column resolved");
                resolved
            });

            let raw = column.raw_value(&record).to_string();
            let outcome = if raw.is_empty() {
                DecryptionOutcome::NoCode
            } else {
                self.codec.decode(&raw)
            };
            if !outcome.is_success() {
                stats.failed += 1;
            }
            stats.decoded += 1;

            out.push(AugmentedRecord {
                decrypted: outcome.to_string(),
                encrypted: raw,
                record,
            });

            in_slice += 1;
            if in_slice == self.slice_size {
                in_slice = 0;
                progress.advance(self.slice_size);
                if cancel.is_cancelled() {
                    return Err(PipelineError::Cancelled);
                }
                tokio::task::yield_now().await;
            }
        }

        progress.advance(in_slice);
        Ok(stats)
    }

    /// Convenience wrapper returning the augmented rows directly.
    ///
    /// # Errors
    ///
    /// Same as [`BatchDecoder::decode_into`]; partial rows are dropped.
    // The session drives `decode_into` so partial rows survive a failure;
    // this is the one-shot form for embedders.
    #[allow(dead_code)]
    pub async fn decode_batch<I, E>(
        &self,
        records: I,
        progress: &ProgressTracker,
        cancel: &CancelFlag,
    ) -> Result<Vec<AugmentedRecord>, PipelineError>
    where
        I: IntoIterator<Item = Result<Record, E>>,
        E: std::fmt::Display,
    {
        let mut rows = Vec::new();
        self.decode_into(records, &mut rows, progress, cancel)
            .await?;
        Ok(rows)
    }
}
