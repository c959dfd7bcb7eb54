//! Error types for parsely
//!
//! Uses `thiserror` for library errors; `anyhow` stays at the binary edge.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for parsely operations
pub type ParselyResult<T> = Result<T, ParselyError>;

/// Main error type for parsely operations
#[derive(Error, Debug)]
pub enum ParselyError {
    /// Invalid runner configuration (fatal, reported before the watch loop starts)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Test-name delimiter pattern rejected (fatal, configuration-time)
    #[error("invalid test-name pattern: {message}")]
    Pattern { message: String },

    /// External grammar compiler exited non-zero (recoverable)
    #[error("grammar compilation failed (exit {status}): {stderr}")]
    Compilation { status: i32, stderr: String },

    /// Grammar artifact could not be read or evaluated (recoverable)
    #[error("cannot load grammar artifact {path}: {message}")]
    Load { path: PathBuf, message: String },

    /// Test selection glob could not be resolved
    #[error("glob error for '{pattern}': {message}")]
    Glob { pattern: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
