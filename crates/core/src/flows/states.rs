use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingState {
    Idle,
    Gathering,
    AwaitingConfirmation,
    Committing,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingEvent {
    IntentDetected,
    DetailsMerged,
    RequiredDetailsComplete,
    Confirmed,
    Declined,
    SlotConflict,
    CommitSucceeded,
    CommitFailed,
    ResetRequested,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FlowContext {
    pub missing_required_fields: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    PromptForMissingFields,
    SummarizeForConfirmation,
    CheckAvailability,
    CreateCalendarEvent,
    ClearStartTime,
    DiscardIntent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: BookingState,
    pub to: BookingState,
    pub event: BookingEvent,
    pub actions: Vec<FlowAction>,
}
