//! Reply audio retrieval

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use super::{ApiError, ApiState};

/// Build the audio router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/audio/{audio_id}", get(get_audio))
        .with_state(state)
}

/// Stream a synthesized reply artifact.
///
/// The id is the one returned inside a turn response's `audio_url`.
async fn get_audio(
    State(state): State<Arc<ApiState>>,
    Path(audio_id): Path<String>,
) -> Result<Response, ApiError> {
    let path = state.artifacts.get(&audio_id)?;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ApiError::Internal(format!("artifact read failed: {e}")))?;

    tracing::debug!(audio_id = %audio_id, bytes = bytes.len(), "serving artifact");

    Ok((
        [
            (header::CONTENT_TYPE, "audio/mpeg"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::ACCEPT_RANGES, "bytes"),
        ],
        bytes,
    )
        .into_response())
}
