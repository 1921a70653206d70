use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DURATION_MINUTES: i64 = 30;

/// The agent's working hypothesis of what the user wants to book.
///
/// Fields accumulate across turns; a field is only replaced when the user
/// explicitly restates it. The intent is committable once `confirmed` is set
/// and both `title` and `start_time` are present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingIntent {
    pub title: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub duration_minutes: i64,
    pub attendees: BTreeSet<String>,
    pub confirmed: bool,
}

impl Default for BookingIntent {
    fn default() -> Self {
        Self {
            title: None,
            start_time: None,
            duration_minutes: DEFAULT_DURATION_MINUTES,
            attendees: BTreeSet::new(),
            confirmed: false,
        }
    }
}

impl BookingIntent {
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.start_time.map(|start| start + Duration::minutes(self.duration_minutes))
    }

    pub fn is_committable(&self) -> bool {
        self.confirmed && self.title.is_some() && self.start_time.is_some()
    }

    /// Required fields still missing before the intent can be summarized for
    /// confirmation.
    pub fn missing_required_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.title.is_none() {
            missing.push("title".to_string());
        }
        if self.start_time.is_none() {
            missing.push("start_time".to_string());
        }
        missing
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.start_time.is_none() && self.attendees.is_empty()
    }
}
