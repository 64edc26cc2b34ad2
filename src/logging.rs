//! Structured JSONL logging plus human-readable stderr output.
//!
//! Dual-output logging for hosts embedding the widget kernel:
//! - **JSONL to file** (~/.tapestry/logs/tapestry-ui.jsonl) - structured for
//!   tooling to parse
//! - **Pretty to stderr** - human-readable for developers
//!
//! Library code only emits `tracing` events; nothing here runs unless the
//! host calls [`init`]. The returned guard must be kept alive for the
//! duration of the program or buffered file output is lost.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Guard that must be kept alive for the duration of the program.
/// Dropping this guard flushes and closes the log file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize the dual-output logging system.
///
/// Default filter is `info`; override with `RUST_LOG`.
pub fn init() -> LoggingGuard {
    let log_dir = log_dir();
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("[logging] failed to create log directory: {}", e);
    }

    let path = log_path();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .ok();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // `fmt::Layer` is generic over the subscriber it attaches to, and the two
    // branches below build different subscriber stacks, so construct the
    // pretty layer separately in each branch.
    macro_rules! pretty_layer {
        () => {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .compact()
        };
    }

    match file {
        Some(file) => {
            let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file);
            let json_layer = fmt::layer()
                .json()
                .with_writer(non_blocking_file)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .with_span_events(FmtSpan::NONE);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(json_layer)
                .with(pretty_layer!())
                .init();

            tracing::info!(log_path = %path.display(), "logging initialized");
            LoggingGuard {
                _file_guard: file_guard,
            }
        }
        None => {
            // File unavailable (read-only home, sandbox): stderr only.
            let (sink, file_guard) = tracing_appender::non_blocking(std::io::sink());
            drop(sink);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(pretty_layer!())
                .init();

            tracing::warn!(log_path = %path.display(), "log file unavailable, stderr only");
            LoggingGuard {
                _file_guard: file_guard,
            }
        }
    }
}

fn log_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".tapestry").join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("tapestry-logs"))
}

/// Path of the JSONL log file.
pub fn log_path() -> PathBuf {
    log_dir().join("tapestry-ui.jsonl")
}
