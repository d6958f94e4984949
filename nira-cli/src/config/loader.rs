use super::types::{
    AvatarSection, ModelsSection, NiraConfig, OllamaSection, RawNiraConfig, RawOllamaSection,
    RawServerSection, RawSpeechSection, ServerSection, SpeechSection,
};
use anyhow::Result;
use directories::ProjectDirs;
use std::path::PathBuf;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<NiraConfig> {
        let mut raw = RawNiraConfig::default();

        // Layer 1: User config
        if let Some(user_path) = Self::user_config_path()
            && user_path.exists()
        {
            let contents = std::fs::read_to_string(&user_path)?;
            let user_config: RawNiraConfig = toml::from_str(&contents)?;
            raw = Self::merge_raw(raw, user_config);
        }

        // Layer 2: Project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            let contents = std::fs::read_to_string(&project_path)?;
            let project_config: RawNiraConfig = toml::from_str(&contents)?;
            raw = Self::merge_raw(raw, project_config);
        }

        Ok(Self::finalize(raw))
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "nira").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with NIRA_CONFIG env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(path) = std::env::var("NIRA_CONFIG") {
            PathBuf::from(path)
        } else {
            PathBuf::from(".nira/config.toml")
        }
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawNiraConfig, overlay: RawNiraConfig) -> RawNiraConfig {
        RawNiraConfig {
            server: RawServerSection {
                host: overlay.server.host.or(base.server.host),
                port: overlay.server.port.or(base.server.port),
            },
            ollama: RawOllamaSection {
                base_url: overlay.ollama.base_url.or(base.ollama.base_url),
                bin: overlay.ollama.bin.or(base.ollama.bin),
                models_dir: overlay.ollama.models_dir.or(base.ollama.models_dir),
            },
            models: ModelsSection {
                catalog: overlay.models.catalog.or(base.models.catalog),
                default_model: overlay.models.default_model.or(base.models.default_model),
            },
            speech: RawSpeechSection {
                stt_enabled: overlay.speech.stt_enabled.or(base.speech.stt_enabled),
                whisper_model: overlay.speech.whisper_model.or(base.speech.whisper_model),
                tts_enabled: overlay.speech.tts_enabled.or(base.speech.tts_enabled),
            },
            avatar: AvatarSection {
                image: overlay.avatar.image.or(base.avatar.image),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawNiraConfig) -> NiraConfig {
        let speech_defaults = SpeechSection::default();
        NiraConfig {
            server: ServerSection {
                host: raw
                    .server
                    .host
                    .unwrap_or_else(|| ServerSection::default().host),
                port: raw.server.port.unwrap_or(ServerSection::default().port),
            },
            ollama: OllamaSection {
                base_url: raw
                    .ollama
                    .base_url
                    .unwrap_or_else(|| OllamaSection::default().base_url),
                bin: raw.ollama.bin,
                models_dir: raw.ollama.models_dir,
            },
            models: raw.models,
            speech: SpeechSection {
                stt_enabled: raw
                    .speech
                    .stt_enabled
                    .unwrap_or(speech_defaults.stt_enabled),
                whisper_model: raw
                    .speech
                    .whisper_model
                    .unwrap_or(speech_defaults.whisper_model),
                tts_enabled: raw
                    .speech
                    .tts_enabled
                    .unwrap_or(speech_defaults.tts_enabled),
            },
            avatar: raw.avatar,
        }
    }

    /// Load config from a specific path (for testing)
    #[cfg(test)]
    pub fn load_from_path(path: &std::path::Path) -> Result<NiraConfig> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let raw: RawNiraConfig = toml::from_str(&contents)?;
            Ok(Self::finalize(raw))
        } else {
            Ok(NiraConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.toml");

        let config = ConfigLoader::load_from_path(&path).unwrap();

        assert_eq!(config.server.port, 5000);
        assert!(config.speech.stt_enabled);
    }

    #[test]
    fn test_load_from_valid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9999

[models]
default_model = "mistral:7b-instruct"

[speech]
stt_enabled = false
"#
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();

        assert_eq!(config.server.port, 9999);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(
            config.models.default_model,
            Some("mistral:7b-instruct".to_string())
        );
        assert!(!config.speech.stt_enabled);
        assert!(config.speech.tts_enabled);
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("invalid.toml");

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "this is not valid toml {{{{").unwrap();

        let result = ConfigLoader::load_from_path(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_raw_overlay_overrides_base() {
        let base: RawNiraConfig = toml::from_str(
            r#"
[server]
host = "127.0.0.1"
port = 5000

[models]
catalog = ["llama3.1:8b-instruct"]
"#,
        )
        .unwrap();
        let overlay: RawNiraConfig = toml::from_str(
            r#"
[server]
port = 8080
"#,
        )
        .unwrap();

        let merged = ConfigLoader::merge_raw(base, overlay);

        assert_eq!(merged.server.port, Some(8080));
        // overlay's None falls through to base value via .or()
        assert_eq!(merged.server.host, Some("127.0.0.1".to_string()));
        assert_eq!(
            merged.models.catalog,
            Some(vec!["llama3.1:8b-instruct".to_string()])
        );
    }

    #[test]
    fn test_user_config_path_returns_some() {
        let path = ConfigLoader::user_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("nira"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }
}
