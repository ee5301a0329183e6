//! Shared logging utilities for the kubeswitch binary.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "kubeswitch=info,kubeswitch_vault=info";
const MAX_LOG_FILES: usize = 5;

/// Logging configuration for one process.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
    /// The interactive picker owns the terminal; keep the console quiet.
    pub picker_mode: bool,
}

/// Flushes the background file writer when dropped. Hold it for the
/// lifetime of `main`.
#[must_use]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Initialize tracing with a daily rolling log file and stderr output.
///
/// stdout is never written to: command results go there. A log directory
/// that cannot be created disables the file layer with a warning.
pub fn init_logging(config: LogConfig<'_>) -> LogGuard {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let mut file_guard = None;
    let file_layer = match ensure_logs_dir().and_then(|dir| file_appender(&dir, config.app_name)) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            file_guard = Some(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(env_filter.clone()),
            )
        }
        Err(err) => {
            eprintln!("Warning: file logging disabled: {:#}", err);
            None
        }
    };

    let console_filter = match console_directive(config.verbose, config.picker_mode) {
        Some(directive) => EnvFilter::new(directive),
        None => env_filter,
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter),
        )
        .init();

    LogGuard { _file: file_guard }
}

/// Console override; `None` means the console follows the file filter.
fn console_directive(verbose: bool, picker_mode: bool) -> Option<&'static str> {
    if picker_mode && !verbose {
        Some("warn")
    } else {
        None
    }
}

/// `<dir>/<app>.<date>.log`, rotated daily, oldest files pruned.
fn file_appender(dir: &Path, app_name: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(app_name)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .with_context(|| format!("Failed to open log file in {}", dir.display()))
}

/// Get the kubeswitch home directory.
///
/// Priority:
/// 1) KUBESWITCH_HOME
/// 2) ~/.kube
/// 3) ./.kube
pub fn kubeswitch_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("KUBESWITCH_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .map(|home| home.join(".kube"))
        .unwrap_or_else(|| PathBuf::from(".").join(".kube"))
}

/// Get the logs directory: ~/.kube/switch-logs
pub fn logs_dir() -> PathBuf {
    kubeswitch_home().join("switch-logs")
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}
