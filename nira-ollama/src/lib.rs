//! Ollama server management for the NIRA backend.
//!
//! This crate owns everything that talks to the local inference server:
//!
//! - [`ProcessSupervisor`] locates and spawns the `ollama serve` process.
//! - [`HealthProbe`] answers "is the server accepting requests?".
//! - [`ServerLifecycleManager`] composes the two into one idempotent
//!   `ensure_running` entry point used before every server interaction.
//! - [`ModelCatalogClient`] lists locally-installed models.
//! - [`PullJobManager`] runs background model downloads with polled progress.
//! - [`ChatClient`] forwards a conversation and returns the reply.
//!
//! All state is explicitly constructed and dependency-injected; there are
//! no module-level singletons.

mod catalog;
mod chat;
mod error;
mod health;
mod lifecycle;
mod pull;
mod supervisor;

pub use catalog::{ModelCatalogClient, ModelDescriptor};
pub use chat::{ChatClient, ChatMessage};
pub use error::{OllamaError, Result};
pub use health::HealthProbe;
pub use lifecycle::ServerLifecycleManager;
pub use pull::{PullJob, PullJobManager};
pub use supervisor::{DEFAULT_OLLAMA_HOST, OLLAMA_BIN_ENV, ProcessSupervisor};

/// Default base URL of the local Ollama server.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";
