//! Text-to-speech via an external synthesis CLI.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, SpeechError};

/// Synthesis binaries probed in order.
const TTS_CANDIDATES: &[&str] = &["espeak-ng", "espeak"];

/// Wraps an espeak-compatible CLI that renders text to a wav file.
pub struct Synthesizer {
    binary: PathBuf,
}

impl Synthesizer {
    /// Locate a synthesis binary in PATH.
    pub fn new() -> Result<Self> {
        let binary = TTS_CANDIDATES
            .iter()
            .find_map(|name| which::which(name).ok())
            .ok_or(SpeechError::NotInstalled("espeak-ng"))?;
        Ok(Self { binary })
    }

    /// Use an explicit synthesis binary (used by tests).
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Render `text` to a wav file at `out_path`.
    pub async fn synthesize(&self, text: &str, out_path: &Path) -> Result<()> {
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let output = Command::new(&self.binary)
            .arg("-w")
            .arg(out_path)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(SpeechError::Tool {
                tool: "espeak-ng",
                message: String::from_utf8_lossy(&output.stderr)
                    .chars()
                    .take(500)
                    .collect(),
            });
        }
        if !out_path.is_file() {
            return Err(SpeechError::NoOutput("espeak-ng"));
        }

        debug!(out = %out_path.display(), chars = text.len(), "synthesized speech");
        Ok(())
    }
}
