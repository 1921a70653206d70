use bookly_core::{BookingIntent, CalendarEvent};
use bookly_llm::ExtractedFields;
use chrono::{DateTime, Utc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmationReply {
    Affirmative,
    Negative,
    Unclear,
}

pub fn is_reset(text: &str) -> bool {
    let normalized = normalize_text(text);

    // Single-word triggers match whole tokens only, so "nonstop" or
    // "unstoppable" never discard the intent.
    let reset_words = ["cancel", "nevermind", "reset", "stop", "abort"];
    if tokenize(&normalized).iter().any(|token| reset_words.contains(token)) {
        return true;
    }

    let reset_phrases = ["never mind", "forget it", "start over"];
    reset_phrases.iter().any(|phrase| normalized.contains(phrase))
}

pub fn classify_confirmation(text: &str) -> ConfirmationReply {
    let normalized = normalize_text(text);
    let tokens = tokenize(&normalized);

    let negative = ["no", "nope", "nah", "don't", "dont", "wrong", "incorrect", "change"];
    if tokens.iter().any(|token| negative.contains(token)) {
        return ConfirmationReply::Negative;
    }

    let affirmative =
        ["yes", "yep", "yeah", "sure", "confirm", "confirmed", "correct", "ok", "okay", "book"];
    if tokens.iter().any(|token| affirmative.contains(token)) {
        return ConfirmationReply::Affirmative;
    }

    ConfirmationReply::Unclear
}

/// Merge newly extracted fields into the accumulated intent. Only fields the
/// user restated are replaced; everything else is untouched. Returns whether
/// anything changed.
pub fn merge_fields(intent: &mut BookingIntent, fields: &ExtractedFields) -> bool {
    let mut changed = false;

    if let Some(title) = &fields.title {
        if intent.title.as_deref() != Some(title.as_str()) {
            intent.title = Some(title.clone());
            changed = true;
        }
    }
    if let Some(start_time) = fields.start_time {
        if intent.start_time != Some(start_time) {
            intent.start_time = Some(start_time);
            changed = true;
        }
    }
    if let Some(duration_minutes) = fields.duration_minutes {
        if intent.duration_minutes != duration_minutes {
            intent.duration_minutes = duration_minutes;
            changed = true;
        }
    }
    for attendee in &fields.attendees {
        if intent.attendees.insert(attendee.clone()) {
            changed = true;
        }
    }

    changed
}

pub fn extraction_instructions(now: DateTime<Utc>) -> String {
    format!(
        "You extract calendar booking details from the user's latest message. \
         The current date and time is {} (UTC). \
         Respond with a single JSON object and nothing else, using exactly these keys: \
         \"title\" (string or null), \
         \"start_time\" (RFC 3339 timestamp or null; resolve relative dates like \
         \"tomorrow at 2 PM\" against the current date), \
         \"duration_minutes\" (integer or null), \
         \"attendees\" (array of email addresses, possibly empty), \
         \"wants_booking\" (true when the user is asking to schedule something). \
         Use null for anything the user did not state in this message. \
         Never invent values.",
        now.to_rfc3339()
    )
}

pub fn help_reply() -> String {
    "I can book calendar appointments for you. Tell me what you'd like to schedule and when, \
     for example: \"Book a project sync tomorrow at 2 PM for 30 minutes.\""
        .to_string()
}

pub fn missing_fields_reply(intent: &BookingIntent) -> String {
    let missing = intent.missing_required_fields();
    let ask = match (missing.iter().any(|f| f == "title"), missing.iter().any(|f| f == "start_time"))
    {
        (true, true) => "What should I call it, and when should it start?",
        (true, false) => "What should I call it?",
        (false, true) => "When should it start?",
        (false, false) => "Anything else to add before I confirm?",
    };

    match summarize_known(intent) {
        Some(known) => format!("Got it so far: {known}. {ask}"),
        None => ask.to_string(),
    }
}

pub fn summary_reply(intent: &BookingIntent) -> String {
    let title = intent.title.as_deref().unwrap_or("(untitled)");
    let when = intent.start_time.map(format_time).unwrap_or_else(|| "(no time)".to_string());
    let attendees = if intent.attendees.is_empty() {
        String::new()
    } else {
        format!(
            " with {}",
            intent.attendees.iter().cloned().collect::<Vec<_>>().join(", ")
        )
    };

    format!(
        "Here's what I have: \"{title}\" on {when} for {} minutes{attendees}. \
         Shall I book it? (yes/no)",
        intent.duration_minutes
    )
}

pub fn change_prompt() -> String {
    "No problem - what would you like to change?".to_string()
}

pub fn confirm_retry_reply() -> String {
    "Just to be sure: should I book it? Please answer yes or no.".to_string()
}

pub fn conflict_reply(start: DateTime<Utc>) -> String {
    format!(
        "That slot ({}) is already busy on the calendar. When else works for you?",
        format_time(start)
    )
}

pub fn booked_reply(event: &CalendarEvent) -> String {
    format!(
        "Done! Booked \"{}\" on {} (event id {}). Anything else?",
        event.title,
        format_time(event.start_time),
        event.id
    )
}

pub fn reset_reply() -> String {
    "Okay, I've discarded that booking. Let me know when you'd like to schedule something."
        .to_string()
}

fn summarize_known(intent: &BookingIntent) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(title) = &intent.title {
        parts.push(format!("\"{title}\""));
    }
    if let Some(start) = intent.start_time {
        parts.push(format_time(start));
    }
    if !intent.attendees.is_empty() {
        parts.push(format!("{} attendee(s)", intent.attendees.len()));
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

fn format_time(time: DateTime<Utc>) -> String {
    time.format("%A, %B %-d at %H:%M UTC").to_string()
}

fn normalize_text(text: &str) -> String {
    text.to_ascii_lowercase()
}

fn tokenize(normalized: &str) -> Vec<&str> {
    normalized
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '\'')
        .filter(|token| !token.is_empty())
        .collect()
}
