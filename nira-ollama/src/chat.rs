//! Non-streaming chat completion via Ollama's `/api/chat` endpoint.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{OllamaError, Result};
use crate::lifecycle::ServerLifecycleManager;

/// Timeout for a full (non-streaming) completion.
const CHAT_TIMEOUT: Duration = Duration::from_secs(120);

/// One turn in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user", or "assistant".
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Request body for `/api/chat`.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

/// Forwards a conversation to the local server and returns the reply text.
pub struct ChatClient {
    lifecycle: Arc<ServerLifecycleManager>,
    client: reqwest::Client,
}

impl ChatClient {
    #[must_use]
    pub fn new(lifecycle: Arc<ServerLifecycleManager>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(CHAT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { lifecycle, client }
    }

    /// Run one completion and return the assistant's message content.
    ///
    /// Ensures the server is running first; a non-string `message.content`
    /// in the response is a protocol violation, not silently coerced.
    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        self.lifecycle
            .ensure_running()
            .await
            .map_err(|e| OllamaError::ServerUnavailable(e.to_string()))?;

        let url = format!(
            "{}/api/chat",
            self.lifecycle.base_url().trim_end_matches('/')
        );
        let response = self
            .client
            .post(url)
            .json(&ChatRequest {
                model,
                messages,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| OllamaError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OllamaError::Http(format!(
                "Ollama API returned {status}: {body}"
            )));
        }

        let value: JsonValue = response
            .json()
            .await
            .map_err(|e| OllamaError::Http(e.to_string()))?;

        match value
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
        {
            Some(content) => Ok(content.to_string()),
            None => Err(OllamaError::Protocol(value.to_string())),
        }
    }
}
