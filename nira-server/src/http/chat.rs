//! Chat and conversation journal handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use nira_ollama::ChatMessage;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::AppState;
use crate::state::JournalEntry;

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub model_name: Option<String>,
}

/// Request body: the full conversation so far, newest message last.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatApiRequest {
    pub history: Vec<ChatMessage>,
}

/// Chat response: a reply plus optional generated media URLs, or an error.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChatApiResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    pub tts_url: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST /chat — forward the conversation to the model and optionally
/// render the reply as speech and an avatar video.
///
/// On failure nothing is appended to the journal and the response carries
/// the error description for the UI to display.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChatQuery>,
    Json(request): Json<ChatApiRequest>,
) -> Json<ChatApiResponse> {
    let model = query
        .model_name
        .unwrap_or_else(|| state.default_model.clone());

    let reply = match state.chat_client.chat(&model, &request.history).await {
        Ok(reply) => reply,
        Err(e) => {
            return Json(ChatApiResponse {
                error: Some(e.to_string()),
                ..Default::default()
            });
        }
    };

    {
        let mut journal = state.journal.write().await;
        if let Some(user) = request
            .history
            .iter()
            .rev()
            .find(|m| m.role == "user")
        {
            journal.push(JournalEntry::now("user", user.content.clone()));
        }
        journal.push(JournalEntry::now("assistant", reply.clone()));
    }

    let (tts_url, avatar_url) = render_speech(&state, &reply).await;

    Json(ChatApiResponse {
        reply: Some(reply),
        tts_url,
        avatar_url,
        error: None,
    })
}

/// Render the reply as a wav file and, when possible, an avatar video.
///
/// Speech failures degrade to text-only replies; they never fail the
/// chat turn itself.
async fn render_speech(state: &AppState, reply: &str) -> (Option<String>, Option<String>) {
    let Some(synthesizer) = &state.synthesizer else {
        return (None, None);
    };

    let wav_name = format!("reply-{}.wav", Uuid::new_v4().simple());
    let wav_path = state.media_dir.join("tts").join(&wav_name);
    if let Err(e) = synthesizer.synthesize(reply, &wav_path).await {
        warn!(error = %e, "speech synthesis failed; returning text-only reply");
        return (None, None);
    }
    let tts_url = Some(format!("/media/tts/{wav_name}"));

    let avatar_url = match &state.avatar_image {
        Some(image) if state.animator.is_available() => {
            let video_name = format!("avatar-{}.mp4", Uuid::new_v4().simple());
            let video_path = state.media_dir.join("avatar").join(&video_name);
            let produced = state.animator.animate(image, &wav_path, &video_path).await;
            (produced == video_path).then(|| format!("/media/avatar/{video_name}"))
        }
        _ => None,
    };

    (tts_url, avatar_url)
}

/// Conversation journal response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub messages: Vec<JournalEntry>,
}

/// GET /conversation — the journal of successful turns.
pub async fn get_conversation(State(state): State<Arc<AppState>>) -> Json<ConversationResponse> {
    Json(ConversationResponse {
        messages: state.journal.read().await.clone(),
    })
}

/// DELETE /conversation — clear the journal.
pub async fn clear_conversation(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    state.journal.write().await.clear();
    Json(serde_json::json!({"status": "cleared"}))
}
