//! Serves generated media (speech audio, avatar videos) from disk.

use std::path::{Component, Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::debug;

use crate::AppState;

/// Resolve a URL path against the media root, rejecting traversal.
fn resolve(media_dir: &FsPath, rel: &str) -> Option<PathBuf> {
    let rel = FsPath::new(rel);
    if rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(media_dir.join(rel))
}

/// GET /media/{path} — serve a generated file with a guessed content type.
pub async fn serve(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> impl IntoResponse {
    let Some(full_path) = resolve(&state.media_dir, &path) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match tokio::fs::read(&full_path).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(&full_path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.to_string())], bytes).into_response()
        }
        Err(e) => {
            debug!(path = %full_path.display(), error = %e, "media file not readable");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::create_router;
    use axum_test::TestServer;

    #[test]
    fn resolve_rejects_parent_components() {
        let root = FsPath::new("/srv/media");
        assert!(resolve(root, "../etc/passwd").is_none());
        assert!(resolve(root, "tts/../../secret").is_none());
        assert_eq!(
            resolve(root, "tts/reply.wav"),
            Some(PathBuf::from("/srv/media/tts/reply.wav"))
        );
    }

    #[tokio::test]
    async fn serves_existing_file_with_content_type() {
        let temp = tempfile::TempDir::new().unwrap();
        let tts_dir = temp.path().join("tts");
        std::fs::create_dir_all(&tts_dir).unwrap();
        std::fs::write(tts_dir.join("reply.wav"), b"RIFF").unwrap();

        let state = Arc::new(AppState::new().with_media_dir(temp.path()));
        let server = TestServer::new(create_router(state)).unwrap();

        let response = server.get("/media/tts/reply.wav").await;
        response.assert_status_ok();
        let content_type = response.header("content-type");
        assert!(content_type.to_str().unwrap().starts_with("audio/"));
        assert_eq!(response.as_bytes().as_ref(), b"RIFF");
    }

    #[tokio::test]
    async fn missing_file_is_404() {
        let temp = tempfile::TempDir::new().unwrap();
        let state = Arc::new(AppState::new().with_media_dir(temp.path()));
        let server = TestServer::new(create_router(state)).unwrap();

        let response = server.get("/media/tts/nope.wav").await;
        response.assert_status_not_found();
    }
}
