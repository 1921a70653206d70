use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use bookly_agent::SessionStore;
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    sessions: Arc<SessionStore>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub active_sessions: usize,
    pub checked_at: String,
}

pub fn router(sessions: Arc<SessionStore>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { sessions })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ready",
        active_sessions: state.sessions.len().await,
        checked_at: Utc::now().to_rfc3339(),
    };
    (StatusCode::OK, Json(payload))
}
