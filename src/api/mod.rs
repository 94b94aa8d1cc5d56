//! HTTP API server for the pitch gateway

pub mod audio;
pub mod chat;
pub mod health;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::artifacts::ArtifactStore;
use crate::orchestrator::Orchestrator;
use crate::session::SessionStore;

/// Session id used when a request names none
pub const DEFAULT_SESSION_ID: &str = "default";

/// Shared state for API handlers
pub struct ApiState {
    /// Turn pipeline
    pub orchestrator: Orchestrator,
    /// Session mapping, for resets and status
    pub sessions: Arc<SessionStore>,
    /// Artifact lookup for audio retrieval
    pub artifacts: ArtifactStore,
    /// Models reported by the status endpoint
    pub stt_model: String,
    /// Models reported by the status endpoint
    pub tts_model: String,
    /// Chat model reported by the status endpoint
    pub chat_model: String,
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    /// Create a server over the shared state
    #[must_use]
    pub fn new(state: Arc<ApiState>, port: u16, static_dir: Option<PathBuf>) -> Self {
        Self {
            state,
            port,
            static_dir,
        }
    }

    /// Build the router with all routes
    fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(chat::router(self.state.clone()))
            .merge(audio::router(self.state.clone()))
            .merge(health::router(self.state.clone()));

        // Serve the web frontend when configured
        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir = ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));
            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        }

        // Permissive CORS for the browser frontend
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if the server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Internal(format!("API server error: {e}")))?;

        Ok(())
    }
}

/// API-facing error with a stable code per failure kind
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed request input
    BadRequest(String),
    /// Transcription produced no usable speech
    NoSpeech(String),
    /// LLM capability failed
    Generation(String),
    /// TTS capability or artifact publishing failed
    Synthesis(String),
    /// Requested resource absent
    NotFound(String),
    /// Anything else
    Internal(String),
}

impl From<crate::Error> for ApiError {
    fn from(err: crate::Error) -> Self {
        match err {
            crate::Error::Validation(m) => Self::BadRequest(m),
            crate::Error::Transcription(m) => Self::NoSpeech(m),
            crate::Error::Generation(m) => Self::Generation(m),
            crate::Error::Synthesis(m) => Self::Synthesis(m),
            crate::Error::NotFound(m) => Self::NotFound(m),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, "bad_request", m),
            Self::NoSpeech(m) => (StatusCode::UNPROCESSABLE_ENTITY, "no_speech_detected", m),
            Self::Generation(m) => (StatusCode::INTERNAL_SERVER_ERROR, "generation_failed", m),
            Self::Synthesis(m) => (StatusCode::INTERNAL_SERVER_ERROR, "synthesis_failed", m),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m),
            Self::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", m),
        };

        tracing::debug!(code, message = %message, "request failed");

        (
            status,
            Json(ErrorResponse {
                error: ErrorBody { code, message },
            }),
        )
            .into_response()
    }
}
