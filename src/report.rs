//! Error reporting for background pipeline stages.
//!
//! Capture and pump threads cannot return errors to a caller; they report
//! through this trait instead.

use std::fmt;

/// Errors surfaced by a running pipeline stage.
#[derive(Debug, Clone)]
pub enum StageError {
    /// Recoverable error; the stage keeps running.
    Recoverable(String),
    /// Fatal error; the stage shuts down.
    Fatal(String),
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::Recoverable(msg) => write!(f, "Recoverable error: {}", msg),
            StageError::Fatal(msg) => write!(f, "Fatal error: {}", msg),
        }
    }
}

impl std::error::Error for StageError {}

/// Trait for reporting stage errors.
pub trait ErrorReporter: Send + Sync {
    /// Reports an error from a named stage.
    fn report(&self, stage: &str, error: &StageError);
}

/// Error reporter that logs to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, stage: &str, error: &StageError) {
        eprintln!("[{}] {}", stage, error);
    }
}
