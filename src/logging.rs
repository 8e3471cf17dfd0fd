//! Tracing setup. The TUI owns stderr, so it logs to a file instead.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "issam=info,reqwest=warn,hyper=warn";

fn env_filter() -> EnvFilter {
    // Users can override with RUST_LOG=debug to see everything.
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Log to `<dir>/issam.log`. Keep the guard alive until exit so buffered
/// lines are flushed.
pub fn init_file(dir: &Path) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(dir)?;
    let file_appender = tracing_appender::rolling::never(dir, "issam.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_env_filter(env_filter())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(guard)
}

/// Log to stderr, for the one-shot commands.
pub fn init_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter())
        .try_init();
}
