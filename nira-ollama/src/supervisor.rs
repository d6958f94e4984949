//! Locating and spawning the Ollama server executable.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use tracing::debug;

use crate::error::{OllamaError, Result};

/// Environment variable overriding the Ollama binary location.
pub const OLLAMA_BIN_ENV: &str = "OLLAMA_BIN";

/// Default host the managed server binds to when none is configured.
pub const DEFAULT_OLLAMA_HOST: &str = "127.0.0.1:11434";

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Locates the Ollama executable and spawns `ollama serve` with model
/// storage redirected into app-owned data.
pub struct ProcessSupervisor {
    /// Explicit binary override from configuration.
    binary: Option<PathBuf>,
    /// Where the spawned server should store model weights.
    models_dir: PathBuf,
}

impl ProcessSupervisor {
    /// Create a supervisor using the default app-owned models directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            binary: None,
            models_dir: nira_paths::models_dir(),
        }
    }

    /// Use an explicit binary path, checked ahead of the environment and PATH.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = Some(binary.into());
        self
    }

    /// Override the models storage directory (used by tests).
    #[must_use]
    pub fn with_models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.models_dir = dir.into();
        self
    }

    /// Locate the Ollama executable.
    ///
    /// Search order: configured override, `OLLAMA_BIN`, a bundled
    /// `bin/ollama` next to the current executable, then PATH.
    /// Candidates that are not regular files fall through to the next source.
    pub fn find_binary(&self) -> Option<PathBuf> {
        if let Some(binary) = &self.binary
            && binary.is_file()
        {
            return Some(binary.clone());
        }

        if let Ok(env_bin) = std::env::var(OLLAMA_BIN_ENV) {
            let path = PathBuf::from(env_bin);
            if path.is_file() {
                return Some(path);
            }
        }

        if let Ok(exe) = std::env::current_exe()
            && let Some(install_dir) = exe.parent()
        {
            for name in ["bin/ollama.exe", "bin/ollama"] {
                let candidate = install_dir.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }

        which::which("ollama").ok()
    }

    /// Spawn `<binary> serve` in the foreground with stdio discarded.
    ///
    /// Ensures the models directory exists first; the server's own logs are
    /// not consumed by the manager.
    pub fn spawn(&self, binary: &Path) -> Result<Child> {
        std::fs::create_dir_all(&self.models_dir)?;

        let mut cmd = Command::new(binary);
        cmd.arg("serve")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .env("OLLAMA_MODELS", &self.models_dir);

        if std::env::var_os("OLLAMA_HOST").is_none() {
            cmd.env("OLLAMA_HOST", DEFAULT_OLLAMA_HOST);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let child = cmd.spawn().map_err(OllamaError::Launch)?;
        debug!(pid = child.id(), binary = %binary.display(), "spawned ollama serve");
        Ok(child)
    }
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_override_wins_when_it_exists() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let supervisor = ProcessSupervisor::new().with_binary(temp.path());
        assert_eq!(supervisor.find_binary(), Some(temp.path().to_path_buf()));
    }

    #[test]
    fn missing_override_falls_through() {
        let temp = tempfile::TempDir::new().unwrap();
        let supervisor = ProcessSupervisor::new().with_binary(temp.path().join("no-such-ollama"));
        // Falls through to env/bundled/PATH; must not return the bogus path.
        let found = supervisor.find_binary();
        assert_ne!(found, Some(temp.path().join("no-such-ollama")));
    }

    #[test]
    fn spawn_nonexistent_binary_is_launch_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let supervisor = ProcessSupervisor::new().with_models_dir(temp.path().join("models"));
        let err = supervisor
            .spawn(&temp.path().join("no-such-ollama"))
            .unwrap_err();
        assert!(matches!(err, OllamaError::Launch(_)));
    }

    #[test]
    fn spawn_creates_models_dir_before_failing() {
        let temp = tempfile::TempDir::new().unwrap();
        let models = temp.path().join("ollama/models");
        let supervisor = ProcessSupervisor::new().with_models_dir(&models);
        let _ = supervisor.spawn(&temp.path().join("no-such-ollama"));
        assert!(models.is_dir());
    }
}
