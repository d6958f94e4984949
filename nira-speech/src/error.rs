//! Error types for speech tool wrappers.

use thiserror::Error;

/// Result type for speech operations.
pub type Result<T> = std::result::Result<T, SpeechError>;

/// Errors from the external speech tools.
#[derive(Debug, Error)]
pub enum SpeechError {
    /// Required tool is not installed or not in PATH.
    #[error("{0} is not installed or not in PATH")]
    NotInstalled(&'static str),

    /// Filesystem or process I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The tool ran but reported failure.
    #[error("{tool} failed: {message}")]
    Tool { tool: &'static str, message: String },

    /// The tool ran but produced no usable output.
    #[error("{0} produced no output")]
    NoOutput(&'static str),
}
