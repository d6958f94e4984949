//! nira-server - HTTP backend for the NIRA desktop assistant
//!
//! This crate owns the shared application state (Ollama lifecycle, pull
//! jobs, speech tools, conversation journal) and exposes the REST API the
//! desktop frontend talks to.

mod error;
pub mod http;
mod state;

use std::sync::Arc;

use tokio::net::TcpListener;

pub use error::ServerError;
pub use http::create_router;
pub use state::{AppState, DEFAULT_MODEL_CATALOG, JournalEntry};

/// The main NIRA backend server
pub struct NiraServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl NiraServer {
    /// Create a new server with default state
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            state: Arc::new(AppState::new()),
        }
    }

    /// Create a server with custom state
    pub fn with_state(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the shared application state
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Run the server, binding to the configured address.
    ///
    /// Serves until Ctrl-C, then tears down background pull tasks and any
    /// Ollama child process this server launched.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.clone(),
                source: e,
            })?;

        tracing::info!("NIRA backend listening on {}", addr);
        self.serve(listener).await
    }

    /// Serve on an already-bound listener (used by tests for port 0).
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        let state = Arc::clone(&self.state);
        let router = create_router(Arc::clone(&self.state));

        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("shutdown signal received");
            })
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        state.shutdown().await;
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    /// Create a new ServerConfig with the specified host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the socket address string (e.g., "127.0.0.1:5000")
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_default_is_local() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 5000);
        assert_eq!(config.addr(), "127.0.0.1:5000");
    }

    #[test]
    fn server_config_addr() {
        let config = ServerConfig::new("0.0.0.0", 8080);
        assert_eq!(config.addr(), "0.0.0.0:8080");
    }

    #[test]
    fn nira_server_exposes_state() {
        let config = ServerConfig::default();
        let server = NiraServer::new(config.clone());
        assert_eq!(server.config().addr(), config.addr());
        assert_eq!(
            server.state().default_model,
            DEFAULT_MODEL_CATALOG[0]
        );
    }
}
