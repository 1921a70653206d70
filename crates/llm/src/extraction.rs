use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

/// Booking fields the model identified in the latest user message. Absent
/// fields mean "the user said nothing new about this", never "clear it".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub title: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub attendees: Vec<String>,
    pub wants_booking: bool,
}

/// Tagged result of an extraction attempt, so merge logic stays exhaustive
/// without guessing provider-specific output shapes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Extraction {
    Fields(ExtractedFields),
    Unparsable,
}

/// Parse a raw completion into booking fields.
///
/// Models wrap JSON in prose and code fences more often than not, so this
/// hunts for the outermost object and tolerates missing or null fields.
/// Anything that does not yield a JSON object degrades to `Unparsable`.
pub fn parse_extraction(raw: &str) -> Extraction {
    let Some(json_slice) = outermost_object(raw) else {
        return Extraction::Unparsable;
    };

    let Ok(parsed) = serde_json::from_str::<RawExtraction>(json_slice) else {
        return Extraction::Unparsable;
    };

    let fields = ExtractedFields {
        title: parsed.title.and_then(non_empty),
        start_time: parsed.start_time.as_deref().and_then(parse_timestamp),
        duration_minutes: parsed.duration_minutes.filter(|minutes| *minutes > 0),
        attendees: parsed
            .attendees
            .unwrap_or_default()
            .into_iter()
            .filter_map(non_empty)
            .filter(|email| email.contains('@'))
            .collect(),
        wants_booking: parsed.wants_booking.unwrap_or(false),
    };

    Extraction::Fields(fields)
}

fn outermost_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Models frequently emit a naive ISO timestamp; take it as UTC.
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M"))
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

#[derive(Debug, Deserialize)]
struct RawExtraction {
    title: Option<String>,
    start_time: Option<String>,
    duration_minutes: Option<i64>,
    attendees: Option<Vec<String>>,
    wants_booking: Option<bool>,
}
