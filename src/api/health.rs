//! Health, status, and catalog endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use super::ApiState;
use crate::persona::CaseStudy;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Liveness probe
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// System status including configured models
#[derive(Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub active_sessions: usize,
    pub default_case_study: &'static str,
    pub chat_model: String,
    pub stt_model: String,
    pub tts_model: String,
}

/// Get system status
async fn status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        active_sessions: state.sessions.len(),
        default_case_study: CaseStudy::DEFAULT.id(),
        chat_model: state.chat_model.clone(),
        stt_model: state.stt_model.clone(),
        tts_model: state.tts_model.clone(),
    })
}

/// Case-study entry in the catalog listing
#[derive(Serialize)]
pub struct CaseStudyInfo {
    pub id: &'static str,
    pub name: &'static str,
}

/// Catalog listing response
#[derive(Serialize)]
pub struct CaseStudyListResponse {
    pub case_studies: Vec<CaseStudyInfo>,
    pub default_id: &'static str,
}

/// List the built-in case studies
async fn list_case_studies() -> Json<CaseStudyListResponse> {
    let case_studies = CaseStudy::ALL
        .iter()
        .map(|cs| CaseStudyInfo {
            id: cs.id(),
            name: cs.persona().name,
        })
        .collect();

    Json(CaseStudyListResponse {
        case_studies,
        default_id: CaseStudy::DEFAULT.id(),
    })
}

/// Build the health/status router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route("/api/case-studies", get(list_case_studies))
        .with_state(state)
}
