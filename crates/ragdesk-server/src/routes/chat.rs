//! Ask routes: answer a query within a session, as JSON or as SSE.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, Sse};
use axum::routing::post;
use axum::{Json, Router};
use futures::Stream;
use ragdesk_runtime::{AgentEvent, AgentResponse};
use serde::Deserialize;
use tracing::warn;

use super::{find_session, ApiError};
use crate::state::AppState;

type SseStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub message: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions/{id}/ask", post(ask))
        .route("/sessions/{id}/ask/stream", post(ask_stream))
}

fn validate(req: &AskRequest) -> Result<&str, ApiError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".into()));
    }
    Ok(message)
}

/// POST /api/sessions/{id}/ask
async fn ask(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AgentResponse>, ApiError> {
    let message = validate(&req)?;
    let session = find_session(&state, &id)?;
    let response = state.coordinator.handle(&session, message).await?;
    Ok(Json(response))
}

/// POST /api/sessions/{id}/ask/stream
///
/// Emits `routed`, `context`, `token` and `done` events (JSON with a `type`
/// tag), then a final `[DONE]` marker.
async fn ask_stream(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AskRequest>,
) -> Result<Sse<SseStream>, ApiError> {
    let message = validate(&req)?;
    let session = find_session(&state, &id)?;

    let events = match state.coordinator.handle_stream(&session, message).await {
        Ok(events) => events,
        Err(e) => {
            warn!("Streaming ask failed: {}", e);
            let error_stream: SseStream = Box::pin(futures::stream::once(async move {
                Ok::<_, Infallible>(error_event(&e.to_string()))
            }));
            return Ok(Sse::new(error_stream));
        }
    };

    let sse_stream: SseStream = Box::pin(async_stream::stream! {
        for await event in events {
            let done = matches!(event, AgentEvent::Done { .. });
            yield Ok::<_, Infallible>(to_event(&event));
            if done {
                yield Ok(Event::default().data("[DONE]"));
                return;
            }
        }
    });

    Ok(Sse::new(sse_stream))
}

fn to_event(event: &AgentEvent) -> Event {
    Event::default()
        .json_data(event)
        .unwrap_or_else(|e| error_event(&e.to_string()))
}

fn error_event(message: &str) -> Event {
    Event::default().data(serde_json::json!({ "type": "error", "error": message }).to_string())
}
