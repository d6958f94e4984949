//! Application directory paths for NIRA.
//!
//! All persistent state lives under XDG-style base directories so the
//! backend behaves the same whether it is launched by the desktop shell
//! or from a terminal.

use std::io;
use std::path::PathBuf;

/// Get the NIRA config directory.
///
/// Returns `$XDG_CONFIG_HOME/nira` if set, otherwise `~/.config/nira`.
/// This is where `config.toml` is stored.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join("nira")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config/nira")
    } else {
        PathBuf::from(".config/nira")
    }
}

/// Get the NIRA data directory.
///
/// Returns `$XDG_DATA_HOME/nira` if set, otherwise `~/.local/share/nira`.
/// Model weights and generated media live underneath this.
pub fn data_dir() -> PathBuf {
    if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data).join("nira")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".local/share/nira")
    } else {
        PathBuf::from(".local/share/nira")
    }
}

/// Directory where the managed Ollama instance stores model weights.
///
/// The inference server is pointed here via `OLLAMA_MODELS` so downloads
/// land in app-owned storage instead of the user's global Ollama dir.
pub fn models_dir() -> PathBuf {
    data_dir().join("ollama/models")
}

/// Directory for generated media (TTS wav files, avatar videos).
pub fn media_dir() -> PathBuf {
    data_dir().join("media")
}

/// Create a directory (and parents) if it does not exist, returning it.
pub fn ensure_dir(path: PathBuf) -> io::Result<PathBuf> {
    std::fs::create_dir_all(&path)?;
    Ok(path)
}
