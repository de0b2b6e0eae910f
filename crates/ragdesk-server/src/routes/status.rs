//! Status, sample queries and knowledge reload.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use ragdesk_core::Error;

use super::ApiError;
use crate::state::AppState;

/// Canned queries offered by the UI, one per domain.
pub const SAMPLE_QUERIES: [&str; 2] = [
    "What is included in my insurance policy?",
    "How do I calculate annual salary?",
];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(get_status))
        .route("/samples", get(get_samples))
        .route("/knowledge/reload", post(reload_knowledge))
}

/// GET /api/status
async fn get_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let generator = state.coordinator.generator();
    let backend = generator.backend();

    Json(serde_json::json!({
        "llmAvailable": generator.is_available(),
        "llmProvider": backend.map(|b| b.provider().to_string()),
        "model": backend.map(|b| b.model().to_string()),
        "statusLine": generator.status_line(),
        "domains": state.domain_counts(),
        "sessions": state.sessions.len(),
    }))
}

/// GET /api/samples
async fn get_samples() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "samples": SAMPLE_QUERIES }))
}

/// POST /api/knowledge/reload
async fn reload_knowledge(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let counts = tokio::task::spawn_blocking(move || state.reload_knowledge())
        .await
        .map_err(|e| Error::Internal(format!("knowledge reload task failed: {}", e)))??;
    Ok(Json(serde_json::json!({ "domains": counts })))
}
