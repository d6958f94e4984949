//! Avatar video generation via the external `sadtalker` CLI.
//!
//! This is a strictly best-effort pipeline stage: any failure (tool
//! missing, inputs missing, tool error, no output produced) falls back to
//! the still image so the assistant UI always has something to show.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

/// Wraps the `sadtalker` facial-animation tool.
pub struct AvatarAnimator {
    binary: Option<PathBuf>,
}

impl AvatarAnimator {
    /// Locate `sadtalker` in PATH; absence is not an error, animation is
    /// simply skipped.
    #[must_use]
    pub fn new() -> Self {
        Self {
            binary: which::which("sadtalker").ok(),
        }
    }

    /// Use an explicit binary (used by tests).
    #[must_use]
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: Some(binary.into()),
        }
    }

    /// Whether the animation tool is available.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.binary.is_some()
    }

    /// Animate `image` lip-synced to `audio`, writing `out_path`.
    ///
    /// Returns the generated video path, or the still image path when
    /// animation is impossible; never errors.
    pub async fn animate(&self, image: &Path, audio: &Path, out_path: &Path) -> PathBuf {
        if !image.is_file() || !audio.is_file() {
            return image.to_path_buf();
        }
        let Some(binary) = &self.binary else {
            debug!("sadtalker not installed; returning still image");
            return image.to_path_buf();
        };

        let result_dir = out_path.parent().unwrap_or(Path::new("."));
        if let Err(e) = std::fs::create_dir_all(result_dir) {
            warn!(error = %e, "could not create avatar output dir");
            return image.to_path_buf();
        }
        let Some(result_name) = out_path.file_name() else {
            return image.to_path_buf();
        };

        let output = Command::new(binary)
            .arg("--driven_audio")
            .arg(audio)
            .arg("--source_image")
            .arg(image)
            .arg("--result_dir")
            .arg(result_dir)
            .arg("--result_name")
            .arg(result_name)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() && out_path.is_file() => {
                debug!(video = %out_path.display(), "avatar animation finished");
                out_path.to_path_buf()
            }
            Ok(out) => {
                warn!(
                    status = ?out.status,
                    stderr = %String::from_utf8_lossy(&out.stderr),
                    "sadtalker failed; returning still image"
                );
                image.to_path_buf()
            }
            Err(e) => {
                warn!(error = %e, "could not run sadtalker; returning still image");
                image.to_path_buf()
            }
        }
    }
}

impl Default for AvatarAnimator {
    fn default() -> Self {
        Self::new()
    }
}
