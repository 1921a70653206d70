use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A committed calendar event. The remote calendar assigns the identifier
/// and stays authoritative; this struct is only a projection of a remote
/// read or write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A remote-calendar-reported interval, marked free or busy. Never
/// persisted; recomputed on every availability check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeBusyWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub busy: bool,
}

impl FreeBusyWindow {
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::FreeBusyWindow;

    #[test]
    fn overlap_is_exclusive_of_touching_boundaries() {
        let window = FreeBusyWindow {
            start: Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 3, 2, 11, 0, 0).unwrap(),
            busy: true,
        };

        let eleven = Utc.with_ymd_and_hms(2026, 3, 2, 11, 0, 0).unwrap();
        let noon = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        assert!(!window.overlaps(eleven, noon));

        let half_past_ten = Utc.with_ymd_and_hms(2026, 3, 2, 10, 30, 0).unwrap();
        assert!(window.overlaps(half_past_ten, noon));
    }
}
