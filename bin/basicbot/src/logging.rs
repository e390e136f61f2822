use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Route all tracing output to `path`, appending. Nothing is logged to the
/// console; it is reserved for prompts and receipts.
///
/// Logging stops when the returned guard is dropped, so `main` holds it.
pub fn init_file_logging(path: &str) -> Result<WorkerGuard> {
    let (writer, guard) = file_writer(Path::new(path))?;

    tracing_subscriber::registry()
        .with(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    Ok(guard)
}

/// `RUST_LOG` directives when set, `info` otherwise. Unparsable directives are skipped.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(rust_log.unwrap_or_default())
}

fn file_writer(path: &Path) -> Result<(non_blocking::NonBlocking, WorkerGuard)> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create log directory {}", dir.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;

    Ok(tracing_appender::non_blocking(file))
}
