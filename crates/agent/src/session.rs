use std::collections::HashMap;
use std::sync::Arc;

use bookly_core::{BookingIntent, BookingState, Message, Session, SessionId};
use tokio::sync::Mutex;

/// Everything the agent knows about one conversation: flow state, the
/// accumulated intent, and a bounded message history.
#[derive(Clone, Debug)]
pub struct SessionState {
    pub session: Session,
    pub flow_state: BookingState,
    pub intent: BookingIntent,
    pub history: Vec<Message>,
    history_limit: usize,
}

impl SessionState {
    pub fn new(id: SessionId, history_limit: usize) -> Self {
        Self {
            session: Session::new(id),
            flow_state: BookingState::Idle,
            intent: BookingIntent::default(),
            history: Vec::new(),
            history_limit,
        }
    }

    pub fn push_message(&mut self, message: Message) {
        self.history.push(message);
        let overflow = self.history.len().saturating_sub(self.history_limit);
        if overflow > 0 {
            self.history.drain(..overflow);
        }
    }

    pub fn reset_intent(&mut self) {
        let default_duration = self.intent.duration_minutes;
        self.intent = BookingIntent { duration_minutes: default_duration, ..Default::default() };
    }
}

/// Process-local session store. Turns within one session are serialized by
/// the per-session mutex returned from `acquire`; distinct sessions proceed
/// concurrently.
pub struct SessionStore {
    inner: Mutex<HashMap<SessionId, Arc<Mutex<SessionState>>>>,
    history_limit: usize,
}

impl SessionStore {
    pub fn new(history_limit: usize) -> Self {
        Self { inner: Mutex::new(HashMap::new()), history_limit }
    }

    /// Look up or create the session, returning its id and state handle.
    /// Callers hold the inner lock for the whole turn.
    pub async fn acquire(&self, id: Option<SessionId>) -> (SessionId, Arc<Mutex<SessionState>>) {
        let id = id.unwrap_or_else(SessionId::generate);
        let mut sessions = self.inner.lock().await;
        let state = sessions
            .entry(id.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(SessionState::new(id.clone(), self.history_limit)))
            })
            .clone();
        (id, state)
    }

    pub async fn remove(&self, id: &SessionId) -> bool {
        self.inner.lock().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}
