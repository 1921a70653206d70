//! JSON API routes.
//!
//! - `POST   /chat`               - one conversational turn
//! - `POST   /availability`       - free/busy windows for a range
//! - `POST   /book`               - direct booking, no conversation
//! - `GET    /events`             - upcoming events in the configured window
//! - `DELETE /events/{event_id}`  - remove an event

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use bookly_agent::{BookingAgent, SessionStore};
use bookly_calendar::{CalendarClient, CalendarError};
use bookly_core::{BookingState, CalendarEvent, FreeBusyWindow, SessionId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub agent: Arc<BookingAgent>,
    pub calendar: Arc<dyn CalendarClient>,
    pub events_window_days: i64,
    pub default_duration_minutes: i64,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
    pub state: BookingState,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub windows: Vec<FreeBusyWindow>,
}

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub title: String,
    pub start: DateTime<Utc>,
    pub duration: Option<i64>,
    #[serde(default)]
    pub attendees: Vec<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<CalendarEvent>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

type ErrorReply = (StatusCode, Json<ApiError>);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/availability", post(availability))
        .route("/book", post(book))
        .route("/events", get(list_events))
        .route("/events/{event_id}", axum::routing::delete(delete_event))
        .with_state(state)
}

fn bad_request(detail: &str) -> ErrorReply {
    (StatusCode::BAD_REQUEST, Json(ApiError { error: detail.to_string() }))
}

fn calendar_error(error: CalendarError) -> ErrorReply {
    let status = match &error {
        CalendarError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        CalendarError::ConflictOrRejected(_) => StatusCode::CONFLICT,
        CalendarError::NotFound(_) => StatusCode::NOT_FOUND,
    };
    (status, Json(ApiError { error: error.to_string() }))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ErrorReply> {
    if request.message.trim().is_empty() {
        return Err(bad_request("message must not be empty"));
    }

    let requested_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .map(SessionId);
    let (session_id, handle) = state.sessions.acquire(requested_id).await;

    // Holding the session lock for the whole turn serializes concurrent
    // requests against the same session.
    let mut session = handle.lock().await;
    let reply = state.agent.handle_message(&mut session, &request.message).await;

    Ok(Json(ChatResponse {
        session_id: session_id.to_string(),
        reply,
        state: session.flow_state.clone(),
    }))
}

async fn availability(
    State(state): State<AppState>,
    Json(request): Json<AvailabilityRequest>,
) -> Result<Json<AvailabilityResponse>, ErrorReply> {
    if request.start >= request.end {
        return Err(bad_request("start must be before end"));
    }

    let windows = state
        .calendar
        .get_free_busy(request.start, request.end)
        .await
        .map_err(calendar_error)?;
    Ok(Json(AvailabilityResponse { windows }))
}

async fn book(
    State(state): State<AppState>,
    Json(request): Json<BookRequest>,
) -> Result<(StatusCode, Json<CalendarEvent>), ErrorReply> {
    if request.title.trim().is_empty() {
        return Err(bad_request("title must not be empty"));
    }
    let duration = request.duration.unwrap_or(state.default_duration_minutes);
    if duration <= 0 {
        return Err(bad_request("duration must be positive"));
    }
    let end = request.start + Duration::minutes(duration);

    let windows = state
        .calendar
        .get_free_busy(request.start, end)
        .await
        .map_err(calendar_error)?;
    if windows.iter().any(|window| window.busy && window.overlaps(request.start, end)) {
        return Err(calendar_error(CalendarError::ConflictOrRejected(
            "requested slot overlaps a busy period".to_string(),
        )));
    }

    let event = state
        .calendar
        .create_event(
            request.title.trim(),
            request.start,
            end,
            &request.attendees,
            request.description.as_deref(),
        )
        .await
        .map_err(calendar_error)?;

    info!(
        event_name = "api.event_booked",
        calendar_event_id = %event.id,
        "event booked via direct api"
    );
    Ok((StatusCode::CREATED, Json(event)))
}

async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<EventsResponse>, ErrorReply> {
    let start = Utc::now();
    let end = start + Duration::days(state.events_window_days);
    let events = state.calendar.list_events(start, end).await.map_err(calendar_error)?;
    Ok(Json(EventsResponse { events }))
}

async fn delete_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<StatusCode, ErrorReply> {
    state.calendar.delete_event(&event_id).await.map_err(calendar_error)?;
    info!(
        event_name = "api.event_deleted",
        calendar_event_id = %event_id,
        "event deleted via direct api"
    );
    Ok(StatusCode::NO_CONTENT)
}
