//! Model management and health handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use nira_ollama::ModelDescriptor;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AppState;

/// Backend health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: i64,
}

/// Backend health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Inference-server health response.
#[derive(Debug, Serialize, Deserialize)]
pub struct OllamaHealthResponse {
    pub ok: bool,
    pub error: Option<String>,
}

/// GET /ollama/health — make sure the inference server is up.
///
/// Never returns a 5xx: a missing or unhealthy server is reported as
/// `{ok: false, error}` for the UI to display.
pub async fn ollama_health(State(state): State<Arc<AppState>>) -> Json<OllamaHealthResponse> {
    let (ok, error) = state.lifecycle.ensure_running_status().await;
    Json(OllamaHealthResponse { ok, error })
}

/// Recommended models response.
#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogResponse {
    pub models: Vec<String>,
}

/// GET /models/catalog — the fixed list of recommended models.
pub async fn model_catalog(State(state): State<Arc<AppState>>) -> Json<CatalogResponse> {
    Json(CatalogResponse {
        models: state.model_catalog.clone(),
    })
}

/// Locally-installed models response.
#[derive(Debug, Serialize, Deserialize)]
pub struct LocalModelsResponse {
    pub models: Vec<ModelDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /models/local — models actually present on disk.
pub async fn local_models(State(state): State<Arc<AppState>>) -> Json<LocalModelsResponse> {
    match state.catalog.list_installed().await {
        Ok(models) => Json(LocalModelsResponse {
            models,
            error: None,
        }),
        Err(e) => Json(LocalModelsResponse {
            models: Vec::new(),
            error: Some(e.to_string()),
        }),
    }
}

/// Request body for starting a pull.
#[derive(Debug, Deserialize)]
pub struct PullRequest {
    pub model: String,
}

/// Response for starting a pull.
#[derive(Debug, Serialize, Deserialize)]
pub struct PullStartResponse {
    pub job_id: Option<String>,
    pub done: bool,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST /models/pull — start a background download.
///
/// An already-installed model short-circuits to immediate completion
/// without registering a job.
pub async fn start_pull(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PullRequest>,
) -> Json<PullStartResponse> {
    match state.catalog.is_installed(&request.model).await {
        Ok(true) => Json(PullStartResponse {
            job_id: None,
            done: true,
            progress: 100,
            error: None,
        }),
        Ok(false) => {
            let job_id = state.pull_jobs.start_pull(&request.model);
            info!(model = %request.model, job_id, "started model pull");
            Json(PullStartResponse {
                job_id: Some(job_id),
                done: false,
                progress: 0,
                error: None,
            })
        }
        Err(e) => Json(PullStartResponse {
            job_id: None,
            done: false,
            progress: 0,
            error: Some(e.to_string()),
        }),
    }
}

/// GET /models/pull/{job_id} — poll a pull job.
pub async fn pull_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Json<serde_json::Value> {
    match state.pull_jobs.get_status(&job_id) {
        Some(job) => Json(serde_json::to_value(job).unwrap_or_else(
            |_| serde_json::json!({"error": "job not found"}),
        )),
        None => Json(serde_json::json!({"error": "job not found"})),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::create_router;
    use axum_test::TestServer;
    use nira_ollama::{ProcessSupervisor, ServerLifecycleManager};

    async fn healthy_mock_server() -> wiremock::MockServer {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/version"))
            .respond_with(wiremock::ResponseTemplate::new(200))
            .mount(&server)
            .await;
        server
    }

    fn state_for(server: &wiremock::MockServer) -> Arc<AppState> {
        let lifecycle = Arc::new(ServerLifecycleManager::new(
            server.uri(),
            ProcessSupervisor::new(),
        ));
        Arc::new(AppState::with_lifecycle(lifecycle))
    }

    #[tokio::test]
    async fn ollama_health_reports_ok_for_healthy_server() {
        let ollama = healthy_mock_server().await;
        let server = TestServer::new(create_router(state_for(&ollama))).unwrap();

        let response = server.get("/ollama/health").await;
        response.assert_status_ok();
        let body: OllamaHealthResponse = response.json();
        assert!(body.ok);
        assert!(body.error.is_none());
    }

    #[tokio::test]
    async fn local_models_degrade_to_error_field_when_unreachable() {
        let temp = tempfile::TempDir::new().unwrap();
        let bogus = temp.path().join("ollama");
        std::fs::write(&bogus, b"not a binary").unwrap();
        let lifecycle = Arc::new(ServerLifecycleManager::new(
            "http://127.0.0.1:1",
            ProcessSupervisor::new()
                .with_binary(bogus)
                .with_models_dir(temp.path().join("models")),
        ));
        let state = Arc::new(AppState::with_lifecycle(lifecycle));
        let server = TestServer::new(create_router(state)).unwrap();

        let response = server.get("/models/local").await;
        response.assert_status_ok();
        let body: LocalModelsResponse = response.json();
        assert!(body.models.is_empty());
        assert!(body.error.unwrap().contains("Ollama not available"));
    }

    #[tokio::test]
    async fn pull_of_installed_model_short_circuits() {
        let ollama = healthy_mock_server().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/tags"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_raw(
                serde_json::json!({"models": [{"name": "phi3:mini-4k-instruct", "size": 1}]})
                    .to_string(),
                "application/json",
            ))
            .mount(&ollama)
            .await;

        let server = TestServer::new(create_router(state_for(&ollama))).unwrap();
        let response = server
            .post("/models/pull")
            .json(&serde_json::json!({"model": "phi3:mini-4k-instruct"}))
            .await;
        response.assert_status_ok();
        let body: PullStartResponse = response.json();
        assert!(body.job_id.is_none(), "no job for an installed model");
        assert!(body.done);
        assert_eq!(body.progress, 100);
    }

    #[tokio::test]
    async fn pull_of_missing_model_registers_a_job() {
        let ollama = healthy_mock_server().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/tags"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_raw(
                serde_json::json!({"models": []}).to_string(),
                "application/json",
            ))
            .mount(&ollama)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/api/pull"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_raw("{\"status\":\"success\"}\n", "application/x-ndjson"),
            )
            .mount(&ollama)
            .await;

        let server = TestServer::new(create_router(state_for(&ollama))).unwrap();
        let response = server
            .post("/models/pull")
            .json(&serde_json::json!({"model": "phi3:mini-4k-instruct"}))
            .await;
        let body: PullStartResponse = response.json();
        let job_id = body.job_id.expect("job registered");
        assert!(!body.done);

        let status = server.get(&format!("/models/pull/{job_id}")).await;
        status.assert_status_ok();
        let job: serde_json::Value = status.json();
        assert_eq!(job["job_id"], job_id.as_str());
    }

    #[tokio::test]
    async fn unknown_job_id_is_error_in_body() {
        let ollama = healthy_mock_server().await;
        let server = TestServer::new(create_router(state_for(&ollama))).unwrap();

        let response = server.get("/models/pull/deadbeef0000").await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "job not found");
    }
}
