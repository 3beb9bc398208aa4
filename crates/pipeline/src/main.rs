//! `voucher-pipeline` — batch decode binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise structured JSON logging.
//! 3. Build the fixed voucher key and the pipeline session.
//! 4. Pre-count input rows (two-pass mode, unless disabled).
//! 5. Decode the batch, with a background task logging progress.
//! 6. Export to the configured format and write the artifact.

mod batch;
mod config;
mod crypto;
mod export;
mod input;
mod pipeline;
mod progress;
mod telemetry;

use anyhow::{Context, Result};
use common::PipelineError;
use tracing::{info, warn};

use config::{Config, ExportFormat};
use crypto::VoucherKey;
use input::CsvSource;
use pipeline::Pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        input = %cfg.input_path,
        format = ?cfg.export_format,
        "voucher-pipeline starting"
    );

    // -----------------------------------------------------------------------
    // 3. Key + session
    // -----------------------------------------------------------------------
    let key = VoucherKey::new(cfg.voucher_key.as_bytes()).context("invalid voucher key")?;
    let mut pipeline = Pipeline::new(key, &cfg);
    let source = CsvSource::new(&cfg.input_path);

    // An interrupt cancels cooperatively at the next slice or chunk boundary.
    let cancel = pipeline.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling at the next boundary");
            cancel.cancel();
        }
    });

    // -----------------------------------------------------------------------
    // 4. Pre-count (two-pass mode)
    // -----------------------------------------------------------------------
    if cfg.precount {
        let total = pipeline.count(&source).await.context("row pre-count failed")?;
        info!(total, "input rows counted");
    }

    // -----------------------------------------------------------------------
    // 5. Decode
    // -----------------------------------------------------------------------
    let _progress_log = progress::log_task(pipeline.progress().subscribe());

    let records = source
        .records()
        .with_context(|| format!("failed to open input: {}", cfg.input_path))?;
    let stats = match pipeline.decode(records).await {
        Ok(stats) => stats,
        Err(e) => {
            warn!(
                phase = ?pipeline.phase(),
                rows_preserved = pipeline.rows().len(),
                "decode aborted"
            );
            return Err(e).context("batch decode failed");
        }
    };
    info!(
        rows = stats.decoded,
        failed = stats.failed,
        "batch decoded"
    );

    // -----------------------------------------------------------------------
    // 6. Export + deliver
    // -----------------------------------------------------------------------
    let artifact = match pipeline.export(cfg.export_format).await {
        Ok(artifact) => artifact,
        Err(e @ PipelineError::ExportCapabilityUnavailable { .. }) => {
            // The workbook path refuses large batches; the CSV path always
            // delivers.
            warn!(error = %e, "falling back to CSV export");
            pipeline.acknowledge();
            pipeline
                .export(ExportFormat::Csv)
                .await
                .context("fallback CSV export failed")?
        }
        Err(e) => return Err(e).context("export failed"),
    };

    let path = std::path::Path::new(&cfg.output_dir).join(&artifact.filename);
    tokio::fs::write(&path, &artifact.bytes)
        .await
        .with_context(|| format!("failed to write artifact: {}", path.display()))?;
    info!(
        path = %path.display(),
        bytes = artifact.bytes.len(),
        "export artifact written"
    );

    Ok(())
}
