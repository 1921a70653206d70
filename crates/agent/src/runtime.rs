use std::sync::Arc;

use bookly_calendar::{CalendarClient, CalendarError};
use bookly_core::config::AgentConfig;
use bookly_core::{
    BookingError, BookingEvent, BookingState, FlowContext, FlowEngine, Message,
};
use bookly_llm::{parse_extraction, Extraction, LlmClient, LlmError};
use chrono::Utc;
use tracing::{info, warn};

use crate::conversation::{
    self, booked_reply, change_prompt, confirm_retry_reply, conflict_reply, help_reply,
    merge_fields, missing_fields_reply, reset_reply, summary_reply, ConfirmationReply,
};
use crate::session::SessionState;

/// One turn at a time: classify, extract, merge, transition, commit. The
/// caller holds the session mutex for the whole turn, so state mutations
/// here are never interleaved within a session.
pub struct BookingAgent {
    llm: Arc<dyn LlmClient>,
    calendar: Arc<dyn CalendarClient>,
    engine: FlowEngine,
    default_duration_minutes: i64,
}

impl BookingAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        calendar: Arc<dyn CalendarClient>,
        config: &AgentConfig,
    ) -> Self {
        Self {
            llm,
            calendar,
            engine: FlowEngine::default(),
            default_duration_minutes: config.default_duration_minutes,
        }
    }

    pub async fn handle_message(&self, state: &mut SessionState, text: &str) -> String {
        state.push_message(Message::user(text));
        let reply = self.handle_turn(state, text).await;
        state.push_message(Message::agent(reply.clone()));
        info!(
            event_name = "agent.turn_completed",
            session_id = %state.session.id,
            flow_state = ?state.flow_state,
            "turn completed"
        );
        reply
    }

    async fn handle_turn(&self, state: &mut SessionState, text: &str) -> String {
        if conversation::is_reset(text) {
            return self.handle_reset(state);
        }

        match state.flow_state.clone() {
            BookingState::AwaitingConfirmation => self.handle_confirmation(state, text).await,
            BookingState::Idle | BookingState::Gathering => self.handle_gathering(state).await,
            // A stored Committing state means a previous turn was torn down
            // mid-commit; nothing was written, so re-confirm.
            BookingState::Committing => {
                state.flow_state = BookingState::AwaitingConfirmation;
                state.intent.confirmed = false;
                summary_reply(&state.intent)
            }
        }
    }

    fn handle_reset(&self, state: &mut SessionState) -> String {
        match self.apply(state, BookingEvent::ResetRequested) {
            Ok(()) => {
                state.reset_intent();
                reset_reply()
            }
            Err(error) => self.recover(state, error),
        }
    }

    async fn handle_confirmation(&self, state: &mut SessionState, text: &str) -> String {
        match conversation::classify_confirmation(text) {
            ConfirmationReply::Affirmative => {
                if let Err(error) = self.apply(state, BookingEvent::Confirmed) {
                    return self.recover(state, error);
                }
                state.intent.confirmed = true;
                self.commit(state).await
            }
            ConfirmationReply::Negative => {
                if let Err(error) = self.apply(state, BookingEvent::Declined) {
                    return self.recover(state, error);
                }
                state.intent.confirmed = false;
                self.merge_corrections(state).await
            }
            ConfirmationReply::Unclear => confirm_retry_reply(),
        }
    }

    /// A decline often carries the correction in the same breath ("no, make
    /// it 3 PM"), so run extraction before asking what to change.
    async fn merge_corrections(&self, state: &mut SessionState) -> String {
        let changed = match self.extract(state).await {
            Ok(Extraction::Fields(fields)) => merge_fields(&mut state.intent, &fields),
            Ok(Extraction::Unparsable) | Err(_) => false,
        };

        if changed && state.intent.missing_required_fields().is_empty() {
            match self.apply(state, BookingEvent::RequiredDetailsComplete) {
                Ok(()) => summary_reply(&state.intent),
                Err(error) => self.recover(state, error),
            }
        } else if changed {
            missing_fields_reply(&state.intent)
        } else {
            change_prompt()
        }
    }

    async fn handle_gathering(&self, state: &mut SessionState) -> String {
        let extraction = match self.extract(state).await {
            Ok(extraction) => extraction,
            Err(error) => {
                warn!(
                    event_name = "agent.extraction_failed",
                    session_id = %state.session.id,
                    error = %error,
                    "llm extraction failed; leaving session state untouched"
                );
                return BookingError::ExtractionFailure(error.to_string())
                    .user_message()
                    .to_string();
            }
        };

        let fields = match extraction {
            Extraction::Fields(fields) => fields,
            Extraction::Unparsable => {
                return match state.flow_state {
                    BookingState::Idle => help_reply(),
                    _ => missing_fields_reply(&state.intent),
                };
            }
        };

        let has_signal = fields.wants_booking
            || fields.title.is_some()
            || fields.start_time.is_some()
            || fields.duration_minutes.is_some()
            || !fields.attendees.is_empty();

        if state.flow_state == BookingState::Idle {
            if !has_signal {
                return help_reply();
            }
            if let Err(error) = self.apply(state, BookingEvent::IntentDetected) {
                return self.recover(state, error);
            }
            state.intent.duration_minutes = self.default_duration_minutes;
        }

        merge_fields(&mut state.intent, &fields);

        if state.intent.missing_required_fields().is_empty() {
            match self.apply(state, BookingEvent::RequiredDetailsComplete) {
                Ok(()) => summary_reply(&state.intent),
                Err(error) => self.recover(state, error),
            }
        } else {
            if let Err(error) = self.apply(state, BookingEvent::DetailsMerged) {
                return self.recover(state, error);
            }
            missing_fields_reply(&state.intent)
        }
    }

    /// Runs with `flow_state == Committing`. Checks the live free/busy
    /// projection, then writes. Transport failure keeps the gathered details
    /// and returns to confirmation; a busy slot clears only the start time.
    async fn commit(&self, state: &mut SessionState) -> String {
        let (Some(start), Some(end)) = (state.intent.start_time, state.intent.end_time()) else {
            return self.recover_incomplete_commit(state);
        };

        let windows = match self.calendar.get_free_busy(start, end).await {
            Ok(windows) => windows,
            Err(error) => return self.commit_failed(state, error),
        };

        if windows.iter().any(|window| window.busy && window.overlaps(start, end)) {
            return self.slot_conflict(state, start);
        }

        let title = state.intent.title.clone().unwrap_or_default();
        let attendees: Vec<String> = state.intent.attendees.iter().cloned().collect();
        match self.calendar.create_event(&title, start, end, &attendees, None).await {
            Ok(event) => {
                if let Err(error) = self.apply(state, BookingEvent::CommitSucceeded) {
                    return self.recover(state, error);
                }
                state.reset_intent();
                info!(
                    event_name = "agent.booking_committed",
                    session_id = %state.session.id,
                    calendar_event_id = %event.id,
                    "booking committed"
                );
                booked_reply(&event)
            }
            Err(CalendarError::ConflictOrRejected(detail)) => {
                warn!(
                    event_name = "agent.commit_rejected",
                    session_id = %state.session.id,
                    detail = %detail,
                    "remote calendar rejected the event"
                );
                self.slot_conflict(state, start)
            }
            Err(error) => self.commit_failed(state, error),
        }
    }

    fn slot_conflict(
        &self,
        state: &mut SessionState,
        start: chrono::DateTime<Utc>,
    ) -> String {
        if let Err(error) = self.apply(state, BookingEvent::SlotConflict) {
            return self.recover(state, error);
        }
        state.intent.start_time = None;
        state.intent.confirmed = false;
        conflict_reply(start)
    }

    fn commit_failed(&self, state: &mut SessionState, error: CalendarError) -> String {
        warn!(
            event_name = "agent.commit_failed",
            session_id = %state.session.id,
            error = %error,
            "calendar unavailable during commit"
        );
        if let Err(transition_error) = self.apply(state, BookingEvent::CommitFailed) {
            return self.recover(state, transition_error);
        }
        state.intent.confirmed = false;
        format!("{} {}", BookingError::from(error).user_message(), summary_reply(&state.intent))
    }

    fn recover_incomplete_commit(&self, state: &mut SessionState) -> String {
        // Confirmed without required fields is a programming error; fall back
        // to gathering rather than guessing.
        warn!(
            event_name = "agent.commit_incomplete",
            session_id = %state.session.id,
            "commit reached without required fields"
        );
        state.flow_state = BookingState::Gathering;
        state.intent.confirmed = false;
        missing_fields_reply(&state.intent)
    }

    async fn extract(&self, state: &SessionState) -> Result<Extraction, LlmError> {
        let instructions = conversation::extraction_instructions(Utc::now());
        let raw = self.llm.complete(&state.history, &instructions).await?;
        Ok(parse_extraction(&raw))
    }

    fn apply(
        &self,
        state: &mut SessionState,
        event: BookingEvent,
    ) -> Result<(), bookly_core::FlowTransitionError> {
        let context =
            FlowContext { missing_required_fields: state.intent.missing_required_fields() };
        let outcome = self.engine.apply(&state.flow_state, &event, &context)?;
        state.flow_state = outcome.to;
        Ok(())
    }

    fn recover(
        &self,
        state: &mut SessionState,
        error: bookly_core::FlowTransitionError,
    ) -> String {
        warn!(
            event_name = "agent.flow_recovered",
            session_id = %state.session.id,
            error = %error,
            "unexpected flow transition; resetting session"
        );
        state.flow_state = BookingState::Idle;
        state.reset_intent();
        BookingError::FlowTransition(error).user_message().to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashSet, VecDeque};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use bookly_calendar::{CalendarClient, CalendarError};
    use bookly_core::config::AgentConfig;
    use bookly_core::{BookingState, CalendarEvent, FreeBusyWindow, SessionId};
    use bookly_llm::{LlmClient, LlmError};
    use chrono::{DateTime, Duration, Utc};

    use crate::session::SessionState;

    use super::BookingAgent;

    struct ScriptedLlm {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self { replies: Mutex::new(replies.into()) })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(
            &self,
            _history: &[bookly_core::Message],
            _instructions: &str,
        ) -> Result<String, LlmError> {
            self.replies
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| Ok("{}".to_string()))
        }
    }

    #[derive(Default)]
    struct MockCalendar {
        busy: Vec<(DateTime<Utc>, DateTime<Utc>)>,
        free_busy_unavailable: bool,
        create_error: Option<CalendarError>,
        created: Mutex<Vec<CalendarEvent>>,
        deleted: Mutex<HashSet<String>>,
    }

    #[async_trait]
    impl CalendarClient for MockCalendar {
        async fn get_free_busy(
            &self,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<FreeBusyWindow>, CalendarError> {
            if self.free_busy_unavailable {
                return Err(CalendarError::Unavailable("connection refused".to_string()));
            }
            Ok(self
                .busy
                .iter()
                .map(|(start, end)| FreeBusyWindow { start: *start, end: *end, busy: true })
                .collect())
        }

        async fn create_event(
            &self,
            title: &str,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
            attendees: &[String],
            description: Option<&str>,
        ) -> Result<CalendarEvent, CalendarError> {
            if let Some(error) = &self.create_error {
                return Err(error.clone());
            }
            let mut created = self.created.lock().expect("lock");
            let event = CalendarEvent {
                id: format!("evt-{}", created.len() + 1),
                title: title.to_string(),
                start_time: start,
                end_time: end,
                attendees: attendees.to_vec(),
                description: description.map(str::to_string),
            };
            created.push(event.clone());
            Ok(event)
        }

        async fn list_events(
            &self,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<CalendarEvent>, CalendarError> {
            Ok(self.created.lock().expect("lock").clone())
        }

        async fn delete_event(&self, event_id: &str) -> Result<(), CalendarError> {
            let mut deleted = self.deleted.lock().expect("lock");
            if !deleted.insert(event_id.to_string()) {
                return Err(CalendarError::NotFound(event_id.to_string()));
            }
            Ok(())
        }
    }

    fn agent(llm: Arc<ScriptedLlm>, calendar: Arc<MockCalendar>) -> BookingAgent {
        BookingAgent::new(
            llm,
            calendar,
            &AgentConfig { history_limit: 12, default_duration_minutes: 30 },
        )
    }

    fn fresh_state() -> SessionState {
        SessionState::new(SessionId::generate(), 12)
    }

    fn tomorrow_2pm() -> DateTime<Utc> {
        (Utc::now() + Duration::days(1))
            .date_naive()
            .and_hms_opt(14, 0, 0)
            .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
            .expect("valid time")
    }

    fn meeting_extraction(start: DateTime<Utc>) -> String {
        format!(
            r#"{{"title": "Meeting", "start_time": "{}", "duration_minutes": 30,
                "attendees": [], "wants_booking": true}}"#,
            start.to_rfc3339()
        )
    }

    #[tokio::test]
    async fn chit_chat_stays_idle_and_never_writes() {
        let llm = ScriptedLlm::new(vec![
            Ok(r#"{"wants_booking": false}"#.to_string()),
            Ok(r#"{"title": null, "start_time": null}"#.to_string()),
        ]);
        let calendar = Arc::new(MockCalendar::default());
        let agent = agent(llm, calendar.clone());
        let mut state = fresh_state();

        agent.handle_message(&mut state, "hello there").await;
        agent.handle_message(&mut state, "how are you?").await;

        assert_eq!(state.flow_state, BookingState::Idle);
        assert!(calendar.created.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn happy_path_books_exactly_one_event() {
        let start = tomorrow_2pm();
        let llm = ScriptedLlm::new(vec![Ok(meeting_extraction(start))]);
        let calendar = Arc::new(MockCalendar::default());
        let agent = agent(llm, calendar.clone());
        let mut state = fresh_state();

        let summary = agent
            .handle_message(&mut state, "Book a meeting tomorrow at 2 PM for 30 minutes")
            .await;
        assert_eq!(state.flow_state, BookingState::AwaitingConfirmation);
        assert_eq!(state.intent.start_time, Some(start));
        assert_eq!(state.intent.duration_minutes, 30);
        assert!(summary.contains("yes/no"), "expected a confirmation prompt: {summary}");

        let reply = agent.handle_message(&mut state, "yes").await;
        let created = calendar.created.lock().expect("lock");
        assert_eq!(created.len(), 1, "exactly one create_event call");
        assert_eq!(created[0].title, "Meeting");
        assert_eq!(created[0].start_time, start);
        assert_eq!(created[0].end_time, start + Duration::minutes(30));
        assert_eq!(state.flow_state, BookingState::Idle);
        assert!(reply.contains("evt-1"), "reply should carry the event id: {reply}");
    }

    #[tokio::test]
    async fn negative_reply_never_creates_an_event() {
        let start = tomorrow_2pm();
        let llm = ScriptedLlm::new(vec![Ok(meeting_extraction(start)), Ok("{}".to_string())]);
        let calendar = Arc::new(MockCalendar::default());
        let agent = agent(llm, calendar.clone());
        let mut state = fresh_state();

        agent.handle_message(&mut state, "book a meeting tomorrow at 2pm").await;
        let reply = agent.handle_message(&mut state, "no").await;

        assert!(calendar.created.lock().expect("lock").is_empty());
        assert_eq!(state.flow_state, BookingState::Gathering);
        assert!(!state.intent.confirmed);
        assert!(reply.contains("change"), "should ask what to change: {reply}");
    }

    #[tokio::test]
    async fn decline_with_correction_updates_only_that_field() {
        let start = tomorrow_2pm();
        let corrected = start + Duration::hours(1);
        let llm = ScriptedLlm::new(vec![
            Ok(meeting_extraction(start)),
            Ok(format!(r#"{{"start_time": "{}"}}"#, corrected.to_rfc3339())),
        ]);
        let calendar = Arc::new(MockCalendar::default());
        let agent = agent(llm, calendar.clone());
        let mut state = fresh_state();

        agent.handle_message(&mut state, "book a meeting tomorrow at 2pm").await;
        let reply = agent.handle_message(&mut state, "no, make it 3 PM").await;

        assert_eq!(state.intent.start_time, Some(corrected));
        assert_eq!(state.intent.title.as_deref(), Some("Meeting"));
        assert_eq!(state.flow_state, BookingState::AwaitingConfirmation);
        assert!(reply.contains("yes/no"), "corrected intent should be re-summarized: {reply}");
    }

    #[tokio::test]
    async fn busy_slot_reports_conflict_and_clears_start_time() {
        let start = tomorrow_2pm();
        let llm = ScriptedLlm::new(vec![Ok(meeting_extraction(start))]);
        let calendar = Arc::new(MockCalendar {
            busy: vec![(start - Duration::minutes(15), start + Duration::minutes(15))],
            ..MockCalendar::default()
        });
        let agent = agent(llm, calendar.clone());
        let mut state = fresh_state();

        agent.handle_message(&mut state, "book a meeting tomorrow at 2pm").await;
        let reply = agent.handle_message(&mut state, "yes").await;

        assert!(calendar.created.lock().expect("lock").is_empty());
        assert_eq!(state.flow_state, BookingState::Gathering);
        assert!(state.intent.start_time.is_none(), "conflicting start must be cleared");
        assert_eq!(state.intent.title.as_deref(), Some("Meeting"), "title survives conflict");
        assert!(reply.contains("busy"), "conflict should be reported: {reply}");
    }

    #[tokio::test]
    async fn llm_timeout_leaves_state_unchanged() {
        let llm =
            ScriptedLlm::new(vec![Err(LlmError::Transport("request timed out".to_string()))]);
        let calendar = Arc::new(MockCalendar::default());
        let agent = agent(llm, calendar.clone());
        let mut state = fresh_state();
        let intent_before = state.intent.clone();

        let reply = agent.handle_message(&mut state, "book something tomorrow").await;

        assert_eq!(state.flow_state, BookingState::Idle);
        assert_eq!(state.intent, intent_before, "no partial merge on failure");
        assert!(reply.contains("rephrase"), "expected retry prompt: {reply}");
        assert!(calendar.created.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn unparsable_extraction_is_soft_while_gathering() {
        let start = tomorrow_2pm();
        let llm = ScriptedLlm::new(vec![
            Ok(r#"{"title": "Sync", "start_time": null, "wants_booking": true,
                    "duration_minutes": null, "attendees": []}"#
                .to_string()),
            Ok("I'm sorry, I can't produce JSON today.".to_string()),
            Ok(format!(r#"{{"start_time": "{}"}}"#, start.to_rfc3339())),
        ]);
        let calendar = Arc::new(MockCalendar::default());
        let agent = agent(llm, calendar.clone());
        let mut state = fresh_state();

        agent.handle_message(&mut state, "schedule a sync").await;
        assert_eq!(state.flow_state, BookingState::Gathering);

        let reply = agent.handle_message(&mut state, "gibberish answer turn").await;
        assert_eq!(state.flow_state, BookingState::Gathering);
        assert_eq!(state.intent.title.as_deref(), Some("Sync"), "intent untouched");
        assert!(reply.contains("When"), "should keep prompting for the start: {reply}");

        agent.handle_message(&mut state, "tomorrow at 2pm").await;
        assert_eq!(state.flow_state, BookingState::AwaitingConfirmation);
    }

    #[tokio::test]
    async fn calendar_outage_during_commit_returns_to_confirmation() {
        let start = tomorrow_2pm();
        let llm = ScriptedLlm::new(vec![Ok(meeting_extraction(start))]);
        let calendar =
            Arc::new(MockCalendar { free_busy_unavailable: true, ..MockCalendar::default() });
        let agent = agent(llm, calendar.clone());
        let mut state = fresh_state();

        agent.handle_message(&mut state, "book a meeting tomorrow at 2pm").await;
        let reply = agent.handle_message(&mut state, "yes").await;

        assert_eq!(state.flow_state, BookingState::AwaitingConfirmation);
        assert_eq!(state.intent.start_time, Some(start), "details are kept for retry");
        assert!(!state.intent.confirmed);
        assert!(reply.contains("try again"), "outage should read as retryable: {reply}");
        assert!(calendar.created.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn remote_rejection_is_treated_as_conflict() {
        let start = tomorrow_2pm();
        let llm = ScriptedLlm::new(vec![Ok(meeting_extraction(start))]);
        let calendar = Arc::new(MockCalendar {
            create_error: Some(CalendarError::ConflictOrRejected("duplicate".to_string())),
            ..MockCalendar::default()
        });
        let agent = agent(llm, calendar.clone());
        let mut state = fresh_state();

        agent.handle_message(&mut state, "book a meeting tomorrow at 2pm").await;
        agent.handle_message(&mut state, "yes").await;

        assert_eq!(state.flow_state, BookingState::Gathering);
        assert!(state.intent.start_time.is_none());
    }

    #[tokio::test]
    async fn reset_discards_intent_from_any_point() {
        let start = tomorrow_2pm();
        let llm = ScriptedLlm::new(vec![Ok(meeting_extraction(start))]);
        let calendar = Arc::new(MockCalendar::default());
        let agent = agent(llm, calendar.clone());
        let mut state = fresh_state();

        agent.handle_message(&mut state, "book a meeting tomorrow at 2pm").await;
        assert_eq!(state.flow_state, BookingState::AwaitingConfirmation);

        let reply = agent.handle_message(&mut state, "actually, cancel that").await;
        assert_eq!(state.flow_state, BookingState::Idle);
        assert!(state.intent.is_empty());
        assert!(reply.contains("discarded"), "reset should be acknowledged: {reply}");
        assert!(calendar.created.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn stored_committing_state_falls_back_to_reconfirmation() {
        let llm = ScriptedLlm::new(Vec::new());
        let calendar = Arc::new(MockCalendar::default());
        let agent = agent(llm, calendar.clone());

        // A turn torn down mid-commit leaves Committing behind without
        // having written anything.
        let mut state = fresh_state();
        state.intent.title = Some("Retro".to_string());
        state.intent.start_time = Some(tomorrow_2pm());
        state.intent.confirmed = true;
        state.flow_state = BookingState::Committing;

        let reply = agent.handle_message(&mut state, "did that go through?").await;

        assert_eq!(state.flow_state, BookingState::AwaitingConfirmation);
        assert!(!state.intent.confirmed);
        assert_eq!(state.intent.title.as_deref(), Some("Retro"), "details survive the fallback");
        assert!(reply.contains("yes/no"), "should re-summarize for confirmation: {reply}");
        assert!(calendar.created.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn unclear_confirmation_asks_again_without_side_effects() {
        let start = tomorrow_2pm();
        let llm = ScriptedLlm::new(vec![Ok(meeting_extraction(start))]);
        let calendar = Arc::new(MockCalendar::default());
        let agent = agent(llm, calendar.clone());
        let mut state = fresh_state();

        agent.handle_message(&mut state, "book a meeting tomorrow at 2pm").await;
        let reply = agent.handle_message(&mut state, "hmm maybe").await;

        assert_eq!(state.flow_state, BookingState::AwaitingConfirmation);
        assert!(reply.contains("yes or no"), "should ask explicitly: {reply}");
        assert!(calendar.created.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn repeated_delete_yields_not_found() {
        let calendar = MockCalendar::default();
        assert!(calendar.delete_event("evt-9").await.is_ok());
        assert_eq!(
            calendar.delete_event("evt-9").await,
            Err(CalendarError::NotFound("evt-9".to_string()))
        );
    }
}
