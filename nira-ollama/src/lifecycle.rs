//! Ollama server lifecycle management.
//!
//! [`ServerLifecycleManager`] is the single entry point every other
//! component calls before talking to the inference server. It detects an
//! already-running instance, spawns one when needed, and waits for it to
//! become ready, without ever spawning a duplicate process.

use std::process::Child;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{OllamaError, Result};
use crate::health::HealthProbe;
use crate::supervisor::ProcessSupervisor;

/// Maximum time to wait for Ollama to become ready after a spawn.
const READY_TIMEOUT: Duration = Duration::from_secs(20);

/// Interval between readiness check attempts.
const READY_CHECK_INTERVAL: Duration = Duration::from_millis(400);

/// Manages the Ollama server process for the whole application.
///
/// Holds at most one child process handle; `ensure_running` is safe to
/// call concurrently and repeatedly (it runs on virtually every request
/// path), with a cheap fast path when the server is already up.
pub struct ServerLifecycleManager {
    base_url: String,
    supervisor: ProcessSupervisor,
    probe: HealthProbe,
    /// The server subprocess handle, present only if we spawned it.
    process: Mutex<Option<Child>>,
}

impl ServerLifecycleManager {
    #[must_use]
    pub fn new(base_url: impl Into<String>, supervisor: ProcessSupervisor) -> Self {
        Self {
            base_url: base_url.into(),
            supervisor,
            probe: HealthProbe::new(),
            process: Mutex::new(None),
        }
    }

    /// Base URL of the managed server, e.g. `http://127.0.0.1:11434`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make sure a healthy Ollama server is reachable at `base_url`.
    ///
    /// Fast path: a single health probe when the server is already up
    /// (started out-of-band or by a previous call). Otherwise locates the
    /// binary, spawns it unless a live child is already owned, and polls
    /// readiness for up to 20 seconds.
    pub async fn ensure_running(&self) -> Result<()> {
        if self.probe.check(&self.base_url).await {
            return Ok(());
        }

        {
            let mut guard = self.process.lock().await;

            // A previously spawned child that is still alive means another
            // caller is already mid-startup; skip straight to polling.
            let alive = match guard.as_mut() {
                Some(child) => match child.try_wait() {
                    Ok(None) => true,
                    Ok(Some(status)) => {
                        warn!(?status, "ollama process exited; respawning");
                        *guard = None;
                        false
                    }
                    Err(e) => return Err(OllamaError::Launch(e)),
                },
                None => false,
            };

            if !alive {
                let binary = self
                    .supervisor
                    .find_binary()
                    .ok_or(OllamaError::BinaryNotFound)?;
                let child = self.supervisor.spawn(&binary)?;
                info!(pid = child.id(), "ollama server spawned");
                *guard = Some(child);
            }
        }

        self.wait_for_ready().await
    }

    /// `ensure_running` collapsed to a status pair for callers that render
    /// failures as data instead of propagating them.
    pub async fn ensure_running_status(&self) -> (bool, Option<String>) {
        match self.ensure_running().await {
            Ok(()) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        }
    }

    /// Poll readiness until the server answers or the bounded wait expires.
    async fn wait_for_ready(&self) -> Result<()> {
        let start = std::time::Instant::now();

        loop {
            if self.probe.check(&self.base_url).await {
                debug!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "ollama is ready"
                );
                return Ok(());
            }

            if start.elapsed() >= READY_TIMEOUT {
                return Err(OllamaError::HealthTimeout(READY_TIMEOUT));
            }

            // Detect a crashed child early instead of waiting out the timeout.
            {
                let mut guard = self.process.lock().await;
                if let Some(child) = guard.as_mut() {
                    match child.try_wait() {
                        Ok(Some(status)) => {
                            warn!(?status, "ollama process exited before becoming ready");
                            *guard = None;
                            return Err(OllamaError::Launch(std::io::Error::new(
                                std::io::ErrorKind::BrokenPipe,
                                "Ollama process exited before becoming ready",
                            )));
                        }
                        Ok(None) => {}
                        Err(e) => return Err(OllamaError::Launch(e)),
                    }
                }
            }

            tokio::time::sleep(READY_CHECK_INTERVAL).await;
        }
    }

    /// Terminate an owned child process, best effort.
    ///
    /// Failures are logged and swallowed; a server we did not spawn is
    /// left alone.
    pub async fn shutdown(&self) {
        let mut guard = self.process.lock().await;
        if let Some(mut child) = guard.take() {
            info!("stopping ollama server");
            if let Err(e) = child.kill()
                && e.kind() != std::io::ErrorKind::NotFound
            {
                warn!(error = %e, "failed to kill ollama server");
            }
            match child.wait() {
                Ok(status) => debug!(?status, "ollama server stopped"),
                Err(e) => warn!(error = %e, "error waiting for ollama to exit"),
            }
        }
    }

    /// Whether this manager currently owns a child process (test hook).
    pub async fn owns_process(&self) -> bool {
        self.process.lock().await.is_some()
    }
}

impl Drop for ServerLifecycleManager {
    fn drop(&mut self) {
        if let Some(mut child) = self.process.get_mut().take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
