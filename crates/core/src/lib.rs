pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;

pub use domain::booking::BookingIntent;
pub use domain::event::{CalendarEvent, FreeBusyWindow};
pub use domain::session::{Message, MessageRole, Session, SessionId};
pub use errors::BookingError;
pub use flows::engine::{BookingFlow, FlowDefinition, FlowEngine, FlowTransitionError};
pub use flows::states::{
    BookingEvent, BookingState, FlowAction, FlowContext, TransitionOutcome,
};
