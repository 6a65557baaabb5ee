use std::io;
use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

const LOG_FILE_PREFIX: &str = "vocab-study.log";

/// Keeps the non-blocking file writer alive; drop it only at shutdown.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Installs stdout logging filtered by `config.log_level`, plus a daily
/// rolling file under `config.log_dir` when one is configured. A log
/// directory that cannot be created only disables the file output.
pub fn init_tracing(config: &Config) -> Option<FileLogGuard> {
    let env_filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let file = match config.log_dir.as_deref().map(daily_file_writer) {
        Some(Ok(file)) => Some(file),
        Some(Err(err)) => {
            eprintln!("file logging disabled: {err}");
            None
        }
        None => None,
    };
    let (file_layer, guard) = match file {
        Some((writer, guard)) => (
            Some(fmt::layer().with_writer(writer).with_ansi(false).with_target(true)),
            Some(guard),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();

    if let Some(dir) = config.log_dir.as_deref().filter(|_| guard.is_some()) {
        tracing::info!(dir = %dir.display(), "writing logs to daily files");
    }
    guard.map(|guard| FileLogGuard { _guard: guard })
}

fn daily_file_writer(dir: &Path) -> io::Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}
