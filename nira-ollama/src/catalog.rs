//! Locally-installed model discovery via Ollama's `/api/tags` endpoint.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OllamaError, Result};
use crate::lifecycle::ServerLifecycleManager;

/// Timeout for tag-listing requests.
const TAGS_TIMEOUT: Duration = Duration::from_secs(15);

/// A locally-installed model as reported by the server.
///
/// Reconstructed on every catalog query; never cached or persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    /// Size in bytes, 0 when the server omits it.
    #[serde(default)]
    pub size: u64,
}

/// Response from Ollama's `/api/tags` endpoint.
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    size: Option<u64>,
}

/// Answers "what models are installed?" and "is model X installed?".
pub struct ModelCatalogClient {
    lifecycle: Arc<ServerLifecycleManager>,
    client: reqwest::Client,
}

impl ModelCatalogClient {
    #[must_use]
    pub fn new(lifecycle: Arc<ServerLifecycleManager>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(TAGS_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { lifecycle, client }
    }

    /// List the models installed on the local server.
    ///
    /// Ensures the server is running first; a lifecycle failure surfaces
    /// as [`OllamaError::ServerUnavailable`]. Entries without a usable
    /// name are dropped.
    pub async fn list_installed(&self) -> Result<Vec<ModelDescriptor>> {
        self.lifecycle
            .ensure_running()
            .await
            .map_err(|e| OllamaError::ServerUnavailable(e.to_string()))?;

        let url = format!(
            "{}/api/tags",
            self.lifecycle.base_url().trim_end_matches('/')
        );
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| OllamaError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OllamaError::Http(format!(
                "Ollama API returned status {}",
                response.status()
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| OllamaError::Http(e.to_string()))?;

        Ok(tags
            .models
            .into_iter()
            .filter_map(|entry| {
                let name = entry.name.filter(|n| !n.is_empty())?;
                Some(ModelDescriptor {
                    name,
                    size: entry.size.unwrap_or(0),
                })
            })
            .collect())
    }

    /// Whether `name` exactly matches an installed model.
    ///
    /// Exact string match only; tag suffixes are not normalized, so
    /// `llama3` does not match `llama3:latest`.
    pub async fn is_installed(&self, name: &str) -> Result<bool> {
        let models = self.list_installed().await?;
        Ok(models.iter().any(|m| m.name == name))
    }
}
