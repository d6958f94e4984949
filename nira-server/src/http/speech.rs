//! Speech-to-text upload handler.

use std::sync::Arc;

use axum::{Json, extract::Multipart, extract::State};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::AppState;

/// Transcription response.
#[derive(Debug, Serialize, Deserialize)]
pub struct SttResponse {
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SttResponse {
    fn error(message: impl Into<String>) -> Self {
        Self {
            text: None,
            error: Some(message.into()),
        }
    }
}

/// POST /stt — transcribe an uploaded audio file.
///
/// Expects a multipart body with a `file` field. The upload is written
/// under the media directory, transcribed, and removed afterwards.
pub async fn stt(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Json<SttResponse> {
    let Some(transcriber) = &state.transcriber else {
        return Json(SttResponse::error("speech-to-text is not enabled"));
    };

    let mut audio = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                let name = field
                    .file_name()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "upload.wav".to_string());
                match field.bytes().await {
                    Ok(bytes) => {
                        audio = Some((name, bytes));
                        break;
                    }
                    Err(e) => return Json(SttResponse::error(e.to_string())),
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => return Json(SttResponse::error(e.to_string())),
        }
    }
    let Some((name, bytes)) = audio else {
        return Json(SttResponse::error("missing 'file' field"));
    };

    let extension = std::path::Path::new(&name)
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "wav".to_string());
    let upload_path = state
        .media_dir
        .join("uploads")
        .join(format!("{}.{extension}", Uuid::new_v4().simple()));
    if let Some(parent) = upload_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            return Json(SttResponse::error(e.to_string()));
        }
    }
    if let Err(e) = std::fs::write(&upload_path, &bytes) {
        return Json(SttResponse::error(e.to_string()));
    }

    let result = transcriber
        .transcribe(&upload_path, &state.media_dir.join("stt"))
        .await;

    if let Err(e) = std::fs::remove_file(&upload_path) {
        warn!(path = %upload_path.display(), error = %e, "could not remove upload");
    }

    match result {
        Ok(text) => Json(SttResponse {
            text: Some(text),
            error: None,
        }),
        Err(e) => Json(SttResponse::error(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::create_router;
    use axum_test::TestServer;
    use axum_test::multipart::{MultipartForm, Part};

    #[tokio::test]
    async fn stt_without_transcriber_reports_disabled() {
        let state = Arc::new(AppState::new());
        let server = TestServer::new(create_router(state)).unwrap();

        let form = MultipartForm::new()
            .add_part("file", Part::bytes(b"RIFF".to_vec()).file_name("mic.wav"));
        let response = server.post("/stt").multipart(form).await;
        response.assert_status_ok();
        let body: SttResponse = response.json();
        assert!(body.text.is_none());
        assert_eq!(body.error.as_deref(), Some("speech-to-text is not enabled"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stt_transcribes_uploaded_audio() {
        use std::os::unix::fs::PermissionsExt;
        let temp = tempfile::TempDir::new().unwrap();
        let bin = temp.path().join("whisper");
        std::fs::write(
            &bin,
            "#!/bin/sh\nout=\"$7/$(basename \"${1%.*}\").txt\"\nprintf 'turn on the lights' > \"$out\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

        let state = Arc::new(
            AppState::new()
                .with_media_dir(temp.path().join("media"))
                .with_transcriber(nira_speech::Transcriber::with_binary(bin, "base")),
        );
        let server = TestServer::new(create_router(state)).unwrap();

        let form = MultipartForm::new()
            .add_part("file", Part::bytes(b"RIFF".to_vec()).file_name("mic.wav"));
        let response = server.post("/stt").multipart(form).await;
        response.assert_status_ok();
        let body: SttResponse = response.json();
        assert_eq!(body.text.as_deref(), Some("turn on the lights"));
        assert!(body.error.is_none());

        // The temporary upload is cleaned up.
        let uploads = temp.path().join("media/uploads");
        let leftover = std::fs::read_dir(&uploads)
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(leftover, 0);
    }

    #[tokio::test]
    async fn stt_without_file_field_is_rejected() {
        let temp = tempfile::TempDir::new().unwrap();
        let state = Arc::new(
            AppState::new()
                .with_media_dir(temp.path().join("media"))
                .with_transcriber(nira_speech::Transcriber::with_binary(
                    temp.path().join("whisper"),
                    "base",
                )),
        );
        let server = TestServer::new(create_router(state)).unwrap();

        let form = MultipartForm::new().add_text("other", "value");
        let response = server.post("/stt").multipart(form).await;
        let body: SttResponse = response.json();
        assert_eq!(body.error.as_deref(), Some("missing 'file' field"));
    }
}
