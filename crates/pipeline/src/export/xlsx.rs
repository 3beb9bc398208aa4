//! Conditional binary spreadsheet export.
//!
//! The workbook path is only offered for batches at or under the row limit;
//! above it the caller gets [`PipelineError::ExportCapabilityUnavailable`]
//! and is pointed at the CSV path instead. Oversized cells are truncated
//! with an explicit marker, and large batches spill across multiple sheets.

use bytes::Bytes;
use common::{AugmentedRecord, PipelineError};
use rust_xlsxwriter::Workbook;

use crate::pipeline::CancelFlag;

use super::{dated_filename, sanitise_field, ExportArtifact};

/// Rows per sheet before the export spills into another sheet.
const SHEET_ROW_LIMIT: usize = 65_000;

/// Appended to any cell cut at the character cap.
const TRUNCATION_MARKER: &str = "...[truncated]";

/// Serialises augmented records into an XLSX workbook.
pub struct XlsxExporter {
    row_limit: usize,
    cell_limit: usize,
}

impl XlsxExporter {
    /// Build an exporter refusing batches above `row_limit` rows and capping
    /// cells at `cell_limit` characters.
    pub fn new(row_limit: usize, cell_limit: usize) -> Self {
        Self {
            row_limit,
            cell_limit: cell_limit.max(1),
        }
    }

    /// Serialise `records` into one workbook artifact.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ExportCapabilityUnavailable`] when the batch
    /// exceeds the row limit, [`PipelineError::ExportWrite`] if the workbook
    /// cannot be built, or [`PipelineError::Cancelled`] when the flag is set
    /// at a sheet boundary.
    pub async fn export(
        &self,
        records: &[AugmentedRecord],
        cancel: &CancelFlag,
    ) -> Result<ExportArtifact, PipelineError> {
        if records.len() > self.row_limit {
            return Err(PipelineError::ExportCapabilityUnavailable {
                rows: records.len(),
                limit: self.row_limit,
            });
        }
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let columns = records.first().map(|r| r.columns()).unwrap_or_default();

        let mut workbook = Workbook::new();
        if records.is_empty() {
            // Keep the artifact well-formed: a workbook needs one sheet.
            workbook
                .add_worksheet()
                .set_name("Data")
                .map_err(|e| PipelineError::ExportWrite(e.to_string()))?;
        }

        let sheets = records.chunks(SHEET_ROW_LIMIT).enumerate();
        let multi_sheet = records.len() > SHEET_ROW_LIMIT;

        for (index, sheet_rows) in sheets {
            let name = if multi_sheet {
                format!("Data{}", index + 1)
            } else {
                "Data".to_string()
            };

            let sheet = workbook.add_worksheet();
            sheet
                .set_name(name)
                .map_err(|e| PipelineError::ExportWrite(e.to_string()))?;

            for (col, column) in columns.iter().enumerate() {
                sheet
                    .write_string(0, col as u16, column.as_str())
                    .map_err(|e| PipelineError::ExportWrite(e.to_string()))?;
            }

            for (row, record) in sheet_rows.iter().enumerate() {
                for (col, column) in columns.iter().enumerate() {
                    let cell = self.render_cell(record.value(column));
                    sheet
                        .write_string((row + 1) as u32, col as u16, cell)
                        .map_err(|e| PipelineError::ExportWrite(e.to_string()))?;
                }
            }

            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            tokio::task::yield_now().await;
        }

        let bytes = workbook
            .save_to_buffer()
            .map_err(|e| PipelineError::ExportWrite(e.to_string()))?;

        Ok(ExportArtifact {
            filename: dated_filename("xlsx"),
            bytes: Bytes::from(bytes),
        })
    }

    /// Sanitise a cell and truncate it at the character cap.
    fn render_cell(&self, value: &str) -> String {
        let clean = sanitise_field(value);
        if clean.chars().count() <= self.cell_limit {
            return clean;
        }
        let mut cut: String = clean.chars().take(self.cell_limit).collect();
        cut.push_str(TRUNCATION_MARKER);
        cut
    }
}
