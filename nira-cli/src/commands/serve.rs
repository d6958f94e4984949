//! Serve command for running the NIRA backend server.
//!
//! Assembles the application state from configuration: Ollama lifecycle
//! management, model pulls, and whichever speech tools are installed.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use nira_ollama::{ProcessSupervisor, ServerLifecycleManager};
use nira_server::{AppState, NiraServer, ServerConfig};
use nira_speech::{AvatarAnimator, Synthesizer, Transcriber};

use crate::config::{ConfigLoader, NiraConfig};

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides config)
    #[arg(long)]
    pub host: Option<String>,
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    let config = ConfigLoader::load()?;

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);

    let state = build_state(&config)?;
    info!("Starting NIRA backend on {}:{}", host, port);

    let server = NiraServer::with_state(ServerConfig::new(host, port), Arc::new(state));
    server.run().await.map_err(Into::into)
}

/// Assemble application state from configuration.
///
/// Missing speech tools are logged and skipped; the corresponding
/// endpoints degrade instead of preventing startup.
fn build_state(config: &NiraConfig) -> Result<AppState> {
    let mut supervisor = ProcessSupervisor::new();
    if let Some(bin) = &config.ollama.bin {
        supervisor = supervisor.with_binary(bin);
    }
    if let Some(models_dir) = &config.ollama.models_dir {
        supervisor = supervisor.with_models_dir(models_dir);
    }

    let lifecycle = Arc::new(ServerLifecycleManager::new(
        config.ollama.base_url.clone(),
        supervisor,
    ));

    let media_dir = nira_paths::ensure_dir(nira_paths::media_dir())?;
    let mut state = AppState::with_lifecycle(lifecycle)
        .with_media_dir(media_dir)
        .with_animator(AvatarAnimator::new());

    if let Some(catalog) = &config.models.catalog {
        state = state.with_model_catalog(catalog.clone());
    }
    if let Some(default_model) = &config.models.default_model {
        state = state.with_default_model(default_model);
    }
    if let Some(image) = &config.avatar.image {
        state = state.with_avatar_image(image);
    }

    if config.speech.stt_enabled {
        match Transcriber::new(&config.speech.whisper_model) {
            Ok(transcriber) => state = state.with_transcriber(transcriber),
            Err(e) => warn!("speech-to-text disabled: {}", e),
        }
    }
    if config.speech.tts_enabled {
        match Synthesizer::new() {
            Ok(synthesizer) => state = state.with_synthesizer(synthesizer),
            Err(e) => warn!("text-to-speech disabled: {}", e),
        }
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_args_defaults() {
        use clap::Parser;

        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            serve: ServeArgs,
        }

        let cli = TestCli::parse_from(["test"]);
        assert!(cli.serve.port.is_none());
        assert!(cli.serve.host.is_none());
    }

    #[test]
    fn test_serve_args_custom_port() {
        use clap::Parser;

        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            serve: ServeArgs,
        }

        let cli = TestCli::parse_from(["test", "--port", "8080"]);
        assert_eq!(cli.serve.port, Some(8080));
    }

    #[test]
    fn test_build_state_applies_model_config() {
        let config = NiraConfig {
            models: crate::config::ModelsSection {
                catalog: Some(vec!["phi3:mini-4k-instruct".to_string()]),
                default_model: Some("phi3:mini-4k-instruct".to_string()),
            },
            ..Default::default()
        };

        let state = build_state(&config).unwrap();
        assert_eq!(state.default_model, "phi3:mini-4k-instruct");
        assert_eq!(state.model_catalog.len(), 1);
    }
}
