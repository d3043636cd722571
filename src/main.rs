use std::path::PathBuf;
use std::process::ExitCode;

use chunkscribe::app;

fn usage() -> ExitCode {
    eprintln!("usage: chunkscribe <media-file>");
    eprintln!("       chunkscribe split <media-file> <parts>");
    ExitCode::from(2)
}

#[tokio::main]
async fn main() -> ExitCode {
    // ── Tracing / structured logging ──────────────────────────────────────────
    // Default level = INFO for this crate, WARN for everything else.
    // Override at runtime via the RUST_LOG environment variable:
    //   RUST_LOG=chunkscribe=debug,reqwest=warn chunkscribe talk.mp3
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chunkscribe=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    // ── Dispatch ──────────────────────────────────────────────────────────────
    let args: Vec<String> = std::env::args().skip(1).collect();
    let outcome = match args.as_slice() {
        [path] => app::transcribe(&PathBuf::from(path)).await,
        [cmd, path, parts] if cmd == "split" => match parts.parse::<u32>() {
            Ok(parts) => app::split(&PathBuf::from(path), parts).await,
            Err(_) => Err(app::AppError::Usage(format!(
                "part count must be an integer, got {parts:?}"
            ))),
        },
        _ => return usage(),
    };

    if let Err(e) = outcome {
        tracing::error!("❌ fatal: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
