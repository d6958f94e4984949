//! Error types for Ollama management.

use std::time::Duration;

use thiserror::Error;

/// Result type for Ollama operations.
pub type Result<T> = std::result::Result<T, OllamaError>;

/// Errors that can occur while managing or talking to the Ollama server.
#[derive(Debug, Error)]
pub enum OllamaError {
    /// No Ollama executable could be located.
    #[error("Ollama binary not found; set OLLAMA_BIN or install Ollama")]
    BinaryNotFound,

    /// The OS refused to start the Ollama process.
    #[error("failed to start Ollama: {0}")]
    Launch(#[from] std::io::Error),

    /// The server never became healthy within the bounded wait.
    #[error("timed out waiting for Ollama to start after {0:?}")]
    HealthTimeout(Duration),

    /// A higher-level operation could not proceed because the server is down.
    #[error("Ollama not available: {0}")]
    ServerUnavailable(String),

    /// The pull download stream failed mid-transfer.
    #[error("pull stream failed: {0}")]
    Stream(String),

    /// Polled job id does not exist in the registry.
    #[error("pull job not found: {0}")]
    JobNotFound(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The server answered with something outside the wire contract.
    #[error("unexpected Ollama response: {0}")]
    Protocol(String),
}
