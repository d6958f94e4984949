//! HTTP server module

mod chat;
mod media;
mod models;
mod speech;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;

use crate::AppState;

pub use chat::{ChatApiRequest, ChatApiResponse, ConversationResponse};
pub use models::{HealthResponse, LocalModelsResponse, OllamaHealthResponse, PullStartResponse};
pub use speech::SttResponse;

/// Create the HTTP router with all routes configured.
///
/// The UI-facing endpoints follow an error-in-body convention: handler
/// failures are rendered as a 200 response carrying an `error` field, so
/// the desktop frontend degrades gracefully instead of hard-failing.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(models::health))
        .route("/ollama/health", get(models::ollama_health))
        .route("/models/catalog", get(models::model_catalog))
        .route("/models/local", get(models::local_models))
        .route("/models/pull", post(models::start_pull))
        .route("/models/pull/:job_id", get(models::pull_status))
        .route("/chat", post(chat::chat))
        .route("/conversation", get(chat::get_conversation))
        .route("/conversation", delete(chat::clear_conversation))
        .route("/stt", post(speech::stt))
        .route("/media/*path", get(media::serve))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
