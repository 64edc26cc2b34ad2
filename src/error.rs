use std::sync::Arc;

use thiserror::Error;
use tracing::{error, warn};

/// Errors raised when constructing a [`KeySet`](crate::shortcuts::KeySet).
///
/// These are construction-time invariant violations: the caller supplied a
/// malformed chord. They are never produced during dispatch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeySetError {
    #[error("key set must contain at least one key")]
    Empty,
    #[error("key '{0}' appears more than once in key set")]
    DuplicateKey(String),
}

/// Failure delivered on an image stream.
///
/// Streams surface these through error listeners; the tracker recovers
/// locally and never propagates them into the host's build or paint step.
#[derive(Error, Debug, Clone)]
pub enum ImageStreamError {
    #[error("failed to decode image '{source_name}': {message}")]
    Decode { source_name: String, message: String },
    #[error("image source '{0}' not found")]
    SourceNotFound(String),
    #[error("image stream failed: {0}")]
    Other(Arc<str>),
}

/// Extension trait for silent error logging with caller location tracking.
///
/// Use when the operation is recoverable and the host doesn't need to know.
/// `#[track_caller]` makes the log line point at the call site rather than
/// this module.
pub trait ResultExt<T> {
    fn log_err(self) -> Option<T>;
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for Result<T, E> {
    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                let caller = std::panic::Location::caller();
                error!(
                    error = ?e,
                    location = %format!("{}:{}", caller.file(), caller.line()),
                    "operation failed"
                );
                None
            }
        }
    }

    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?e,
                    location = %format!("{}:{}", caller.file(), caller.line()),
                    "operation warning"
                );
                None
            }
        }
    }
}
