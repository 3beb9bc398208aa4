//! Configuration loading and validation for the pipeline binary.
//!
//! All values are read from environment variables at startup. The process
//! exits with a clear error message if any required variable is missing or
//! invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Export artifact flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Chunked CSV with a UTF-8 byte-order mark. Always available.
    Csv,
    /// Binary spreadsheet workbook, gated on total row count.
    Xlsx,
}

/// Validated pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path of the uploaded CSV to decode. **Required.**
    pub input_path: String,

    /// Directory the export artifact is written into.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Fixed 16-byte symmetric key shared with the voucher issuer. Used for
    /// both HMAC verification and AES decryption.
    #[serde(default = "default_voucher_key")]
    pub voucher_key: String,

    /// Artifact format to produce.
    #[serde(default = "default_export_format")]
    pub export_format: ExportFormat,

    /// Records decoded between yield points.
    #[serde(default = "default_slice_size")]
    pub slice_size: usize,

    /// Rows serialised per export chunk.
    #[serde(default = "default_export_chunk_rows")]
    pub export_chunk_rows: usize,

    /// Row-count gate for the spreadsheet export path.
    #[serde(default = "default_xlsx_row_limit")]
    pub xlsx_row_limit: usize,

    /// Character cap per spreadsheet cell; longer values are truncated.
    #[serde(default = "default_xlsx_cell_limit")]
    pub xlsx_cell_limit: usize,

    /// Run the cheap row pre-count before decoding, so the completion
    /// percentage is accurate from the start.
    #[serde(default = "default_precount")]
    pub precount: bool,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_output_dir() -> String {
    ".".into()
}
fn default_voucher_key() -> String {
    "7563424859574547".into()
}
fn default_export_format() -> ExportFormat {
    ExportFormat::Csv
}
fn default_slice_size() -> usize {
    100
}
fn default_export_chunk_rows() -> usize {
    15_000
}
fn default_xlsx_row_limit() -> usize {
    80_000
}
fn default_xlsx_cell_limit() -> usize {
    30_000
}
fn default_precount() -> bool {
    true
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.input_path, "INPUT_PATH")?;
        ensure_non_empty(&self.output_dir, "OUTPUT_DIR")?;

        if self.voucher_key.len() != crate::crypto::KEY_LEN {
            anyhow::bail!(
                "VOUCHER_KEY must be exactly {} bytes, got {}",
                crate::crypto::KEY_LEN,
                self.voucher_key.len()
            );
        }
        if self.slice_size == 0 {
            anyhow::bail!("SLICE_SIZE must be > 0");
        }
        if self.export_chunk_rows == 0 {
            anyhow::bail!("EXPORT_CHUNK_ROWS must be > 0");
        }
        if self.xlsx_row_limit == 0 {
            anyhow::bail!("XLSX_ROW_LIMIT must be > 0");
        }
        if self.xlsx_cell_limit == 0 {
            anyhow::bail!("XLSX_CELL_LIMIT must be > 0");
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            input_path: "vouchers.csv".into(),
            output_dir: default_output_dir(),
            voucher_key: default_voucher_key(),
            export_format: default_export_format(),
            slice_size: default_slice_size(),
            export_chunk_rows: default_export_chunk_rows(),
            xlsx_row_limit: default_xlsx_row_limit(),
            xlsx_cell_limit: default_xlsx_cell_limit(),
            precount: default_precount(),
            log_level: default_log_level(),
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_output_dir(), ".");
        assert_eq!(default_voucher_key().len(), 16);
        assert_eq!(default_export_format(), ExportFormat::Csv);
        assert_eq!(default_slice_size(), 100);
        assert_eq!(default_export_chunk_rows(), 15_000);
        assert_eq!(default_xlsx_row_limit(), 80_000);
        assert_eq!(default_xlsx_cell_limit(), 30_000);
        assert!(default_precount());
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_input_path() {
        let mut cfg = valid_config();
        cfg.input_path = "  ".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_wrong_key_length() {
        let mut cfg = valid_config();
        cfg.voucher_key = "short".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_slice_size() {
        let mut cfg = valid_config();
        cfg.slice_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn export_format_parses_lowercase_names() {
        let f: ExportFormat = serde_json::from_str("\"xlsx\"").unwrap();
        assert_eq!(f, ExportFormat::Xlsx);
    }
}
