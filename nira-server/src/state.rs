//! Shared application state for the NIRA server.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use nira_ollama::{
    ChatClient, ModelCatalogClient, ProcessSupervisor, PullJobManager, ServerLifecycleManager,
};
use nira_speech::{AvatarAnimator, Synthesizer, Transcriber};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Recommended models offered to the user before anything is installed.
///
/// Distinct from the set of models actually present on disk.
pub const DEFAULT_MODEL_CATALOG: &[&str] = &[
    "llama3.1:8b-instruct",
    "phi3:mini-4k-instruct",
    "mistral:7b-instruct",
    "qwen2.5:7b-instruct",
];

/// One entry in the conversation journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl JournalEntry {
    pub fn now(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Shared application state accessible by all handlers.
///
/// Every manager is an explicitly constructed, dependency-injected
/// component; handlers receive the state via axum's `State` extractor.
pub struct AppState {
    /// Ollama process lifecycle; entry point before any server interaction.
    pub lifecycle: Arc<ServerLifecycleManager>,
    /// Installed-model queries.
    pub catalog: Arc<ModelCatalogClient>,
    /// Background model downloads.
    pub pull_jobs: Arc<PullJobManager>,
    /// Chat forwarding.
    pub chat_client: Arc<ChatClient>,
    /// Speech-to-text, when the whisper tool is available.
    pub transcriber: Option<Arc<Transcriber>>,
    /// Text-to-speech, when a synthesis tool is available.
    pub synthesizer: Option<Arc<Synthesizer>>,
    /// Avatar animation (internally best-effort, always present).
    pub animator: Arc<AvatarAnimator>,
    /// Conversation journal; appended only on successful chat turns.
    pub journal: RwLock<Vec<JournalEntry>>,
    /// Root directory for generated media served under `/media`.
    pub media_dir: PathBuf,
    /// Still image used as the avatar animation source.
    pub avatar_image: Option<PathBuf>,
    /// Recommended model identifiers.
    pub model_catalog: Vec<String>,
    /// Model used when a chat request names none.
    pub default_model: String,
    /// When the server started.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create state for the default local Ollama URL.
    pub fn new() -> Self {
        Self::with_lifecycle(Arc::new(ServerLifecycleManager::new(
            nira_ollama::DEFAULT_BASE_URL,
            ProcessSupervisor::new(),
        )))
    }

    /// Create state around an existing lifecycle manager.
    pub fn with_lifecycle(lifecycle: Arc<ServerLifecycleManager>) -> Self {
        let catalog = Arc::new(ModelCatalogClient::new(Arc::clone(&lifecycle)));
        let pull_jobs = Arc::new(PullJobManager::new(Arc::clone(&lifecycle)));
        let chat_client = Arc::new(ChatClient::new(Arc::clone(&lifecycle)));

        Self {
            lifecycle,
            catalog,
            pull_jobs,
            chat_client,
            transcriber: None,
            synthesizer: None,
            animator: Arc::new(AvatarAnimator::new()),
            journal: RwLock::new(Vec::new()),
            media_dir: nira_paths::media_dir(),
            avatar_image: None,
            model_catalog: DEFAULT_MODEL_CATALOG
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_model: DEFAULT_MODEL_CATALOG[0].to_string(),
            started_at: Utc::now(),
        }
    }

    pub fn with_transcriber(mut self, transcriber: Transcriber) -> Self {
        self.transcriber = Some(Arc::new(transcriber));
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Synthesizer) -> Self {
        self.synthesizer = Some(Arc::new(synthesizer));
        self
    }

    pub fn with_animator(mut self, animator: AvatarAnimator) -> Self {
        self.animator = Arc::new(animator);
        self
    }

    pub fn with_media_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.media_dir = dir.into();
        self
    }

    pub fn with_avatar_image(mut self, image: impl Into<PathBuf>) -> Self {
        self.avatar_image = Some(image.into());
        self
    }

    pub fn with_model_catalog(mut self, models: Vec<String>) -> Self {
        if let Some(first) = models.first() {
            self.default_model = first.clone();
        }
        self.model_catalog = models;
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Returns how long the server has been running.
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }

    /// Tear down background work: abandon pull tasks and stop an owned
    /// Ollama child, best effort.
    pub async fn shutdown(&self) {
        self.pull_jobs.shutdown();
        self.lifecycle.shutdown().await;
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
