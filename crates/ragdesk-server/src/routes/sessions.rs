//! Session lifecycle and conversation history.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use super::{find_session, ApiError};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", delete(delete_session))
        .route("/sessions/{id}/history", get(get_history))
        .route("/sessions/{id}/clear", post(clear_session))
}

/// POST /api/sessions
async fn create_session(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let handle = state.sessions.create_session();
    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": handle.id() })),
    )
}

/// DELETE /api/sessions/{id}
async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> StatusCode {
    if state.sessions.destroy_session(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// GET /api/sessions/{id}/history
async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let handle = find_session(&state, &id)?;
    let session = handle.lock().await;
    Ok(Json(serde_json::json!({
        "createdAt": session.created_at(),
        "turns": session.conversation.all(),
    })))
}

/// POST /api/sessions/{id}/clear
async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let handle = find_session(&state, &id)?;
    handle.lock().await.conversation.clear();
    Ok(StatusCode::NO_CONTENT)
}
