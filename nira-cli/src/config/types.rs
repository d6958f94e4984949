use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default host for the backend server
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default port for the backend server
pub const DEFAULT_PORT: u16 = 5000;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawNiraConfig {
    #[serde(default)]
    pub server: RawServerSection,

    #[serde(default)]
    pub ollama: RawOllamaSection,

    #[serde(default)]
    pub models: ModelsSection,

    #[serde(default)]
    pub speech: RawSpeechSection,

    #[serde(default)]
    pub avatar: AvatarSection,
}

/// Server config as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawServerSection {
    /// Host to bind the backend to
    pub host: Option<String>,

    /// Port for the backend server
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawOllamaSection {
    /// Base URL of the Ollama server
    pub base_url: Option<String>,

    /// Explicit path to the ollama binary
    pub bin: Option<PathBuf>,

    /// Directory Ollama stores model weights in
    pub models_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSpeechSection {
    /// Enable speech-to-text (whisper)
    pub stt_enabled: Option<bool>,

    /// Whisper model name (e.g. "base")
    pub whisper_model: Option<String>,

    /// Enable text-to-speech (espeak)
    pub tts_enabled: Option<bool>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NiraConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub ollama: OllamaSection,

    #[serde(default)]
    pub models: ModelsSection,

    #[serde(default)]
    pub speech: SpeechSection,

    #[serde(default)]
    pub avatar: AvatarSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Host to bind the backend to
    pub host: String,

    /// Port for the backend server
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaSection {
    /// Base URL of the Ollama server
    pub base_url: String,

    /// Explicit path to the ollama binary
    pub bin: Option<PathBuf>,

    /// Directory Ollama stores model weights in
    pub models_dir: Option<PathBuf>,
}

impl Default for OllamaSection {
    fn default() -> Self {
        Self {
            base_url: nira_ollama::DEFAULT_BASE_URL.to_string(),
            bin: None,
            models_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelsSection {
    /// Recommended models offered by /models/catalog
    pub catalog: Option<Vec<String>>,

    /// Model used when a chat request names none
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechSection {
    /// Enable speech-to-text (whisper)
    pub stt_enabled: bool,

    /// Whisper model name (e.g. "base")
    pub whisper_model: String,

    /// Enable text-to-speech (espeak)
    pub tts_enabled: bool,
}

impl Default for SpeechSection {
    fn default() -> Self {
        Self {
            stt_enabled: true,
            whisper_model: "base".to_string(),
            tts_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AvatarSection {
    /// Still image used as the animation source
    pub image: Option<PathBuf>,
}
