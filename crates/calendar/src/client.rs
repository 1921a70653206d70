use async_trait::async_trait;
use bookly_core::{BookingError, CalendarEvent, FreeBusyWindow};
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("calendar unavailable: {0}")]
    Unavailable(String),
    #[error("calendar rejected the request: {0}")]
    ConflictOrRejected(String),
    #[error("no calendar event with id `{0}`")]
    NotFound(String),
}

impl From<CalendarError> for BookingError {
    fn from(value: CalendarError) -> Self {
        match value {
            CalendarError::Unavailable(detail) => Self::CalendarUnavailable(detail),
            CalendarError::ConflictOrRejected(detail) => Self::ConflictOrRejected(detail),
            CalendarError::NotFound(event_id) => Self::NotFound(event_id),
        }
    }
}

/// Seam between the booking agent and the remote calendar service.
#[async_trait]
pub trait CalendarClient: Send + Sync {
    /// Free/busy projection for the queried range, as a gap-free alternating
    /// window sequence. `Unavailable` means "cannot verify, ask the user to
    /// retry" - never a partial answer.
    async fn get_free_busy(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FreeBusyWindow>, CalendarError>;

    async fn create_event(
        &self,
        title: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        attendees: &[String],
        description: Option<&str>,
    ) -> Result<CalendarEvent, CalendarError>;

    async fn list_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;

    /// Deleting an already-deleted identifier yields `NotFound`, so repeated
    /// deletes are safe for callers.
    async fn delete_event(&self, event_id: &str) -> Result<(), CalendarError>;
}
