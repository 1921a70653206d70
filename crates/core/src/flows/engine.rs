use thiserror::Error;

use crate::flows::states::{
    BookingEvent, BookingState, FlowAction, FlowContext, TransitionOutcome,
};

pub trait FlowDefinition {
    fn initial_state(&self) -> BookingState;
    fn transition(
        &self,
        current: &BookingState,
        event: &BookingEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// The multi-turn booking conversation flow: intent accumulation, explicit
/// confirmation, then commit against the remote calendar.
#[derive(Clone, Debug, Default)]
pub struct BookingFlow;

impl FlowDefinition for BookingFlow {
    fn initial_state(&self) -> BookingState {
        BookingState::Idle
    }

    fn transition(
        &self,
        current: &BookingState,
        event: &BookingEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_booking(current, event, context)
    }
}

pub struct FlowEngine<F = BookingFlow> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> BookingState {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: &BookingState,
        event: &BookingEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event, context)
    }
}

impl Default for FlowEngine<BookingFlow> {
    fn default() -> Self {
        Self::new(BookingFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("missing required fields before transition from {state:?}: {missing_fields:?}")]
    MissingRequiredFields { state: BookingState, missing_fields: Vec<String> },
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: BookingState, event: BookingEvent },
}

fn transition_booking(
    current: &BookingState,
    event: &BookingEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use BookingEvent::{
        CommitFailed, CommitSucceeded, Confirmed, Declined, DetailsMerged, IntentDetected,
        RequiredDetailsComplete, ResetRequested, SlotConflict,
    };
    use BookingState::{AwaitingConfirmation, Committing, Gathering, Idle};
    use FlowAction::{
        CheckAvailability, ClearStartTime, CreateCalendarEvent, DiscardIntent,
        PromptForMissingFields, SummarizeForConfirmation,
    };

    let (to, actions) = match (current, event) {
        (Idle, IntentDetected) => (Gathering, vec![PromptForMissingFields]),
        (Gathering, DetailsMerged) => (Gathering, vec![PromptForMissingFields]),
        (Idle, RequiredDetailsComplete) | (Gathering, RequiredDetailsComplete) => {
            if !context.missing_required_fields.is_empty() {
                return Err(FlowTransitionError::MissingRequiredFields {
                    state: current.clone(),
                    missing_fields: context.missing_required_fields.clone(),
                });
            }
            (AwaitingConfirmation, vec![SummarizeForConfirmation])
        }
        (AwaitingConfirmation, Confirmed) => {
            (Committing, vec![CheckAvailability, CreateCalendarEvent])
        }
        (AwaitingConfirmation, Declined) => (Gathering, vec![PromptForMissingFields]),
        (Committing, SlotConflict) => (Gathering, vec![ClearStartTime, PromptForMissingFields]),
        (Committing, CommitSucceeded) => (Idle, vec![DiscardIntent]),
        // The user keeps their gathered details when the remote write fails.
        (Committing, CommitFailed) => (AwaitingConfirmation, vec![SummarizeForConfirmation]),
        (_, ResetRequested) => (Idle, vec![DiscardIntent]),
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                state: current.clone(),
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: current.clone(), to, event: event.clone(), actions })
}
