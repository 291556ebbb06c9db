use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

const LOG_FILE_NAME: &str = "hepatitis-predictor.log";

/// Install the global subscriber for the server.
///
/// `RUST_LOG` wins over `logging.level`. When `logging.dir` is set and
/// writable, a daily rotating file layer is added; keep the returned guard
/// alive until shutdown so buffered lines are flushed.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match config.dir.as_deref().and_then(prepare_log_dir) {
        Some(dir) => {
            // Daily rotating file appender
            let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false) // No color codes in file
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // Console layer
    let console_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed()
    };

    let file_logging_enabled = file_layer.is_some();
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed && file_logging_enabled {
        if let Some(dir) = &config.dir {
            eprintln!("Logging to: {}/{}", dir.display(), LOG_FILE_NAME);
        }
    }
    guard
}

/// Minimal logging for one-shot CLI commands
pub fn init_logging_simple() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(std::io::stderr)
        .try_init();
}

// `tracing_appender::rolling::daily` panics if it cannot create the initial
// file, so writability is checked up front.
fn prepare_log_dir(dir: &Path) -> Option<&Path> {
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!(
            "Warning: Could not create log directory {} ({}), file logging disabled",
            dir.display(),
            e
        );
        return None;
    }

    let probe = dir.join(".hepatitis_write_test");
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&probe)
    {
        Ok(_) => {
            let _ = std::fs::remove_file(&probe);
            Some(dir)
        }
        Err(e) => {
            eprintln!(
                "Warning: Could not write to log directory {} ({}), file logging disabled",
                dir.display(),
                e
            );
            None
        }
    }
}
