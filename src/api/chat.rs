//! Turn and session endpoints

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use super::{ApiError, ApiState, DEFAULT_SESSION_ID};
use crate::orchestrator::TurnRequest;

/// Build the chat router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/reset/{session_id}", post(reset))
        .with_state(state)
}

/// Successful turn response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub transcript: String,
    pub reply: String,
    pub audio_url: String,
}

/// Run one conversational turn.
///
/// Multipart form: an `audio` file part (required) plus optional
/// `session_id` and `case_study` text parts.
async fn chat(
    State(state): State<Arc<ApiState>>,
    mut multipart: Multipart,
) -> Result<Json<ChatResponse>, ApiError> {
    let mut audio: Option<(Vec<u8>, String)> = None;
    let mut session_id: Option<String> = None;
    let mut case_study: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(ToString::to_string);
        match name.as_deref() {
            Some("audio") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("audio/webm")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("unreadable audio part: {e}")))?;
                audio = Some((bytes.to_vec(), content_type));
            }
            Some("session_id") => {
                session_id = field.text().await.ok().filter(|s| !s.is_empty());
            }
            Some("case_study") => {
                case_study = field.text().await.ok().filter(|s| !s.is_empty());
            }
            _ => {}
        }
    }

    let (audio, content_type) =
        audio.ok_or_else(|| ApiError::BadRequest("no audio file provided".to_string()))?;

    let request = TurnRequest {
        session_id: session_id.unwrap_or_else(|| DEFAULT_SESSION_ID.to_string()),
        case_study: case_study.unwrap_or_default(),
        audio,
        content_type,
    };

    tracing::info!(
        session_id = %request.session_id,
        case_study = %request.case_study,
        audio_bytes = request.audio.len(),
        "chat request"
    );

    let result = state.orchestrator.run_turn(request).await?;

    Ok(Json(ChatResponse {
        audio_url: format!("/api/audio/{}", result.audio_id),
        transcript: result.transcript,
        reply: result.reply,
    }))
}

/// Reset acknowledgment
#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub message: &'static str,
}

/// Discard a session's conversation history. Idempotent.
async fn reset(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<String>,
) -> Json<ResetResponse> {
    state.sessions.reset(&session_id);
    Json(ResetResponse {
        message: "conversation reset",
    })
}
