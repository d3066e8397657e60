use crate::config::{GeneralConfig, LogLevel};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

const DEFAULT_LOG_FILE: &str = "valuescope.log";

static INIT_GUARD: OnceLock<()> = OnceLock::new();

/// `RUST_LOG` directives on top of `level`
fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.to_tracing_level_filter().into())
        .from_env_lossy()
}

/// Install the global subscriber described by the `[general]` section.
/// Does nothing when logging is disabled.
pub fn initialize_from_config(general: &GeneralConfig) -> Result<()> {
    if !general.enable_logging {
        return Ok(());
    }
    initialize_logging_with_level(Some(&general.log_file), false, general.log_level)
}

pub fn initialize_logging_with_level(
    log_file_path: Option<&str>,
    console: bool,
    level: LogLevel,
) -> Result<()> {
    if INIT_GUARD.set(()).is_err() {
        // Already initialized elsewhere; do nothing and succeed
        return Ok(());
    }

    let log_path = match log_file_path {
        Some(path) => PathBuf::from(path),
        None => std::env::current_dir()?.join(DEFAULT_LOG_FILE),
    };

    // Try to create log file, but continue if it fails
    let maybe_log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_path);

    match maybe_log_file {
        Ok(log_file) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_writer(log_file)
                .with_target(true)
                .with_ansi(false)
                .with_filter(env_filter(level));

            if console {
                let init_res = tracing_subscriber::registry()
                    .with(file_layer)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_writer(std::io::stdout)
                            .with_filter(env_filter(level)),
                    )
                    .try_init();
                let _ = init_res; // ignore AlreadyInit errors silently
            } else {
                let init_res = tracing_subscriber::registry().with(file_layer).try_init();
                let _ = init_res;
            }
        }
        Err(_) => {
            // Fallback to stdout only if file creation fails
            let init_res = tracing_subscriber::fmt()
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .with_env_filter(env_filter(level))
                .try_init();
            let _ = init_res;
        }
    }

    Ok(())
}
