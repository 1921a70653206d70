use thiserror::Error;

use crate::flows::engine::FlowTransitionError;

/// External-failure taxonomy the booking agent converts into user-facing
/// replies. Nothing here is fatal at the process level; raw transport
/// detail stays out of the user-visible surface.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BookingError {
    #[error("calendar unavailable: {0}")]
    CalendarUnavailable(String),
    #[error("calendar rejected the request: {0}")]
    ConflictOrRejected(String),
    #[error("could not extract booking details: {0}")]
    ExtractionFailure(String),
    #[error("no calendar event with id `{0}`")]
    NotFound(String),
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
}

impl BookingError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::CalendarUnavailable(_) => {
                "I couldn't reach the calendar just now. Please try again in a moment."
            }
            Self::ConflictOrRejected(_) => {
                "The calendar rejected that booking. Let's pick a different time."
            }
            Self::ExtractionFailure(_) => {
                "Sorry, I didn't quite catch that. Could you rephrase?"
            }
            Self::NotFound(_) => "I couldn't find that event. It may already be gone.",
            Self::FlowTransition(_) => {
                "I lost track of where we were. Let's start over with what you'd like to book."
            }
        }
    }
}
