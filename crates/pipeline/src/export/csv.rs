//! Chunked CSV serialisation.
//!
//! The artifact is UTF-8 with a byte-order mark before the header row, LF
//! line endings, and minimal RFC-4180 quoting: a field is wrapped in double
//! quotes (with embedded quotes doubled) only when it contains a comma, a
//! double quote, or a line break. Sanitisation removes line breaks first, so
//! in practice quoting triggers on commas and quotes.

use bytes::{BufMut, BytesMut};
use common::{AugmentedRecord, PipelineError};

use crate::pipeline::CancelFlag;

use super::{dated_filename, sanitise_field, ExportArtifact};

/// UTF-8 byte-order mark, emitted before the header so spreadsheet tools
/// detect the encoding.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Serialises augmented records into a single CSV artifact, a fixed number
/// of rows at a time, yielding control between chunks.
pub struct CsvExporter {
    chunk_rows: usize,
}

impl CsvExporter {
    /// Build an exporter serialising `chunk_rows` rows per chunk.
    pub fn new(chunk_rows: usize) -> Self {
        Self {
            chunk_rows: chunk_rows.max(1),
        }
    }

    /// Serialise `records` into one CSV artifact.
    ///
    /// Columns come from the first record; all records are assumed to share
    /// that column set. An empty batch produces a BOM-only artifact.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ExportWrite`] if serialisation fails, or
    /// [`PipelineError::Cancelled`] when the flag is set at a chunk boundary.
    pub async fn export(
        &self,
        records: &[AugmentedRecord],
        cancel: &CancelFlag,
    ) -> Result<ExportArtifact, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let mut buf = BytesMut::new();
        buf.put_slice(UTF8_BOM);

        let columns = match records.first() {
            Some(first) => first.columns(),
            None => {
                return Ok(ExportArtifact {
                    filename: dated_filename("csv"),
                    bytes: buf.freeze(),
                })
            }
        };

        let mut writer = csv::Writer::from_writer(buf.writer());
        writer
            .write_record(&columns)
            .map_err(|e| PipelineError::ExportWrite(e.to_string()))?;

        for chunk in records.chunks(self.chunk_rows) {
            for record in chunk {
                let row = columns
                    .iter()
                    .map(|column| sanitise_field(record.value(column)));
                writer
                    .write_record(row)
                    .map_err(|e| PipelineError::ExportWrite(e.to_string()))?;
            }
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            tokio::task::yield_now().await;
        }

        let buf = writer
            .into_inner()
            .map_err(|e| PipelineError::ExportWrite(e.to_string()))?
            .into_inner();

        Ok(ExportArtifact {
            filename: dated_filename("csv"),
            bytes: buf.freeze(),
        })
    }
}
