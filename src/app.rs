use std::path::Path;
use std::sync::Arc;

use crate::cancel;
use crate::client::TranscriptionClient;
use crate::config::Config;
use crate::export::{self, OutputFormat};
use crate::media::{self, MediaFile};
use crate::metrics::Metrics;
use crate::orchestrator::{Orchestrator, PipelineError};
use crate::planner::SplitPolicy;

// ── Error type ─────────────────────────────────────────────────────────────────

/// Top-level application error, surfaced only in `main.rs`.
#[derive(Debug)]
pub enum AppError {
    Config(crate::config::ConfigError),
    Io(std::io::Error),
    Pipeline(PipelineError),
    Export(crate::export::ExportError),
    /// Bad command-line invocation (e.g. a part count below 2).
    Usage(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e)   => write!(f, "config error: {e}"),
            Self::Io(e)       => write!(f, "io error: {e}"),
            Self::Pipeline(e) => write!(f, "pipeline error: {e}"),
            Self::Export(e)   => write!(f, "export error: {e}"),
            Self::Usage(e)    => write!(f, "usage error: {e}"),
        }
    }
}

// ── Entry points ───────────────────────────────────────────────────────────────

/// Transcribe one file end to end and print the merged transcript to stdout.
///
/// # Execution flow
/// 1. Load and validate configuration from environment variables.
/// 2. Read the file into memory (the pipeline operates on byte slices; the
///    measured duration is unknown here, so chunking is size-based).
/// 3. Wire up cancellation: SIGINT/SIGTERM triggers the token, which the
///    orchestrator observes between segments.
/// 4. Run the pipeline with per-segment progress logging.
/// 5. Print the transcript; log attempt/failure counts and metrics.
pub async fn transcribe(path: &Path) -> Result<(), AppError> {
    // ── 1. Configuration ──────────────────────────────────────────────────────
    let cfg = Config::load().map_err(AppError::Config)?;
    cfg.log_summary();

    // ── 2. Source file ────────────────────────────────────────────────────────
    let file = load_media(path).await?;
    tracing::info!(
        file = %file.name(),
        size_bytes = file.size_bytes(),
        media_type = %file.media_type(),
        "📂 file loaded"
    );

    // ── 3. Cancellation ───────────────────────────────────────────────────────
    // The token is threaded into the run; the handle lives in a background
    // task that fires it on the first OS signal.
    let (cancel_handle, cancel_token) = cancel::new_pair();
    tokio::spawn(async move {
        cancel::wait_for_os_signal().await;
        tracing::info!("🛑 signal received — cancelling after the current segment");
        cancel_handle.trigger();
    });

    // ── 4. Pipeline ───────────────────────────────────────────────────────────
    let metrics = Arc::new(Metrics::new());
    let client = TranscriptionClient::new(cfg.api_url.clone(), cfg.api_key.clone());
    let orchestrator = Orchestrator::new(client, cfg.payload_limits(), Arc::clone(&metrics))
        .with_continuation_policy(cfg.continuation_policy())
        .with_progress(|completed, total| {
            tracing::info!(completed, total, "📦 segment {completed}/{total} attempted");
        });

    let result = orchestrator
        .run(&file, &cfg.transcription_options(), cancel_token)
        .await
        .map_err(AppError::Pipeline)?;

    // ── 5. Report ─────────────────────────────────────────────────────────────
    if result.failed > 0 {
        tracing::warn!(
            recovered = result.attempted - result.failed,
            attempted = result.attempted,
            "⚠️  partial transcript: {} of {} segments transcribed",
            result.attempted - result.failed,
            result.attempted
        );
    }
    tracing::info!(
        attempted = result.attempted,
        failed = result.failed,
        elapsed_secs = result.elapsed.as_secs_f64(),
        "✅ transcription complete"
    );

    println!("{}", result.merged_text);
    metrics.log_summary();
    Ok(())
}

/// Split one file into `parts` equal byte-range parts next to the source.
pub async fn split(path: &Path, parts: u32) -> Result<(), AppError> {
    let file = load_media(path).await?;
    let out_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let exported = export::split(&file, &SplitPolicy::ByCount(parts), &OutputFormat::Same)
        .map_err(AppError::Export)?;

    for part in &exported {
        let out_path = out_dir.join(&part.filename);
        tokio::fs::write(&out_path, &part.bytes)
            .await
            .map_err(AppError::Io)?;
        tracing::info!(
            file = %out_path.display(),
            size = %part.size_label,
            duration = %part.duration_label,
            "💾 part written"
        );
    }

    tracing::info!(parts = exported.len(), "✅ split complete");
    Ok(())
}

// ── Private helpers ────────────────────────────────────────────────────────────

/// Read the file into a [`MediaFile`], deriving the MIME type from the
/// extension. No decoding happens anywhere in the pipeline, so the measured
/// duration stays unknown and time-based policies are unavailable from the
/// CLI.
async fn load_media(path: &Path) -> Result<MediaFile, AppError> {
    let bytes = tokio::fs::read(path).await.map_err(AppError::Io)?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("media.bin")
        .to_string();
    let media_type = path
        .extension()
        .and_then(|e| e.to_str())
        .map(media::media_type_for_extension)
        .unwrap_or("application/octet-stream");
    Ok(MediaFile::new(name, media_type, bytes))
}
