//! Speech-to-text via the external `whisper` CLI.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, SpeechError};

/// Environment variable pointing at a pre-downloaded whisper model dir.
pub const WHISPER_MODEL_DIR_ENV: &str = "WHISPER_MODEL_DIR";

/// Wraps the `whisper` command-line tool for audio transcription.
pub struct Transcriber {
    binary: PathBuf,
    model: String,
}

impl Transcriber {
    /// Locate `whisper` in PATH with the given model name (e.g. "base").
    pub fn new(model: impl Into<String>) -> Result<Self> {
        let binary = which::which("whisper").map_err(|_| SpeechError::NotInstalled("whisper"))?;
        Ok(Self {
            binary,
            model: model.into(),
        })
    }

    /// Use an explicit whisper binary (used by tests).
    pub fn with_binary(binary: impl Into<PathBuf>, model: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            model: model.into(),
        }
    }

    /// Transcribe an audio file, returning the trimmed text.
    ///
    /// The tool writes `<stem>.txt` into `output_dir`; that file is read
    /// back and the transcript returned.
    pub async fn transcribe(&self, audio: &Path, output_dir: &Path) -> Result<String> {
        std::fs::create_dir_all(output_dir)?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg(audio)
            .arg("--model")
            .arg(&self.model)
            .arg("--output_format")
            .arg("txt")
            .arg("--output_dir")
            .arg(output_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        if let Ok(model_dir) = std::env::var(WHISPER_MODEL_DIR_ENV) {
            if Path::new(&model_dir).is_dir() {
                cmd.arg("--model_dir").arg(model_dir);
            }
        }

        let output = cmd.output().await?;
        if !output.status.success() {
            return Err(SpeechError::Tool {
                tool: "whisper",
                message: String::from_utf8_lossy(&output.stderr)
                    .chars()
                    .take(500)
                    .collect(),
            });
        }

        let stem = audio
            .file_stem()
            .ok_or(SpeechError::NoOutput("whisper"))?
            .to_string_lossy();
        let transcript_path = output_dir.join(format!("{stem}.txt"));
        let text =
            std::fs::read_to_string(&transcript_path).map_err(|_| SpeechError::NoOutput("whisper"))?;

        debug!(audio = %audio.display(), chars = text.len(), "transcription finished");
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn fake_whisper(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("whisper");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn transcribe_reads_back_generated_text() {
        let temp = tempfile::TempDir::new().unwrap();
        // Args: $1 audio, $7 output dir (after --model/--output_format flags).
        let bin = fake_whisper(
            temp.path(),
            r#"out="$7/$(basename "${1%.*}").txt"; printf '  hello from whisper  ' > "$out""#,
        );
        let audio = temp.path().join("mic.wav");
        std::fs::write(&audio, b"RIFF").unwrap();

        let transcriber = Transcriber::with_binary(bin, "base");
        let text = transcriber
            .transcribe(&audio, &temp.path().join("out"))
            .await
            .unwrap();
        assert_eq!(text, "hello from whisper");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tool_failure_carries_stderr() {
        let temp = tempfile::TempDir::new().unwrap();
        let bin = fake_whisper(temp.path(), r#"echo "model load failed" >&2; exit 1"#);
        let audio = temp.path().join("mic.wav");
        std::fs::write(&audio, b"RIFF").unwrap();

        let transcriber = Transcriber::with_binary(bin, "base");
        let err = transcriber
            .transcribe(&audio, &temp.path().join("out"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("model load failed"));
    }

    #[tokio::test]
    async fn missing_binary_is_io_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let transcriber = Transcriber::with_binary(temp.path().join("no-whisper"), "base");
        let audio = temp.path().join("mic.wav");
        std::fs::write(&audio, b"RIFF").unwrap();

        let err = transcriber
            .transcribe(&audio, &temp.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, SpeechError::Io(_)));
    }
}
