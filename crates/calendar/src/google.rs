//! Google Calendar v3 client.
//!
//! Access tokens are obtained by exchanging the configured OAuth refresh
//! token at the Google token endpoint and cached until shortly before
//! expiry. Event and free/busy data is never cached.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use bookly_core::config::CalendarConfig;
use bookly_core::{CalendarEvent, FreeBusyWindow};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::client::{CalendarClient, CalendarError};
use crate::windows::normalize_windows;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Refresh slightly early so a token never expires mid-request.
const TOKEN_EXPIRY_SLACK_SECS: i64 = 60;

pub struct GoogleCalendarClient {
    http: reqwest::Client,
    config: CalendarConfig,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Clone, Debug)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl GoogleCalendarClient {
    pub fn new(config: CalendarConfig) -> Result<Self, CalendarError> {
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| CalendarError::Unavailable(error.to_string()))?;

        Ok(Self { http, config, token: Mutex::new(None) })
    }

    async fn access_token(&self) -> Result<String, CalendarError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() {
                return Ok(token.access_token.clone());
            }
        }

        debug!(event_name = "calendar.token.refresh", "refreshing calendar access token");
        let response = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.expose_secret()),
                ("refresh_token", self.config.refresh_token.expose_secret()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|error| {
                CalendarError::Unavailable(format!("token refresh request failed: {error}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(CalendarError::Unavailable(format!(
                "token refresh failed ({status}): {detail}"
            )));
        }

        let refreshed: TokenResponse = response.json().await.map_err(|error| {
            CalendarError::Unavailable(format!("could not parse token response: {error}"))
        })?;

        let token = CachedToken {
            access_token: refreshed.access_token,
            expires_at: Utc::now()
                + Duration::seconds((refreshed.expires_in - TOKEN_EXPIRY_SLACK_SECS).max(0)),
        };
        let access_token = token.access_token.clone();
        *cached = Some(token);

        Ok(access_token)
    }

    fn events_url(&self) -> String {
        format!("{CALENDAR_API_BASE}/calendars/{}/events", self.config.calendar_id)
    }
}

#[async_trait]
impl CalendarClient for GoogleCalendarClient {
    async fn get_free_busy(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FreeBusyWindow>, CalendarError> {
        let access_token = self.access_token().await?;
        let request = FreeBusyRequest {
            time_min: start.to_rfc3339(),
            time_max: end.to_rfc3339(),
            items: vec![FreeBusyItem { id: self.config.calendar_id.clone() }],
        };

        let response = self
            .http
            .post(format!("{CALENDAR_API_BASE}/freeBusy"))
            .bearer_auth(&access_token)
            .json(&request)
            .send()
            .await
            .map_err(|error| {
                CalendarError::Unavailable(format!("free/busy request failed: {error}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(CalendarError::Unavailable(format!(
                "free/busy query failed ({status}): {detail}"
            )));
        }

        let payload: FreeBusyResponse = response.json().await.map_err(|error| {
            CalendarError::Unavailable(format!("could not parse free/busy response: {error}"))
        })?;

        let busy_periods = payload
            .calendars
            .get(&self.config.calendar_id)
            .map(|calendar| busy_periods_from(&calendar.busy))
            .unwrap_or_default();

        Ok(normalize_windows(start, end, &busy_periods))
    }

    async fn create_event(
        &self,
        title: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        attendees: &[String],
        description: Option<&str>,
    ) -> Result<CalendarEvent, CalendarError> {
        let access_token = self.access_token().await?;
        let request = InsertEventRequest {
            summary: title.to_string(),
            description: description.map(str::to_string),
            start: EventDateTime { date_time: Some(start.to_rfc3339()), date: None },
            end: EventDateTime { date_time: Some(end.to_rfc3339()), date: None },
            attendees: attendees
                .iter()
                .map(|email| GoogleAttendee { email: email.clone() })
                .collect(),
        };

        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(&access_token)
            .json(&request)
            .send()
            .await
            .map_err(|error| {
                CalendarError::Unavailable(format!("event insert request failed: {error}"))
            })?;

        let status = response.status();
        if status == StatusCode::CONFLICT
            || status == StatusCode::FORBIDDEN
            || status == StatusCode::BAD_REQUEST
        {
            let detail = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(CalendarError::ConflictOrRejected(format!(
                "event insert rejected ({status}): {detail}"
            )));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(CalendarError::Unavailable(format!(
                "event insert failed ({status}): {detail}"
            )));
        }

        let created: GoogleEvent = response.json().await.map_err(|error| {
            CalendarError::Unavailable(format!("could not parse created event: {error}"))
        })?;

        event_from_google(created).ok_or_else(|| {
            CalendarError::Unavailable("created event came back without valid times".to_string())
        })
    }

    async fn list_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let access_token = self.access_token().await?;
        let response = self
            .http
            .get(self.events_url())
            .bearer_auth(&access_token)
            .query(&[
                ("timeMin", start.to_rfc3339()),
                ("timeMax", end.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await
            .map_err(|error| {
                CalendarError::Unavailable(format!("event list request failed: {error}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(CalendarError::Unavailable(format!(
                "event list failed ({status}): {detail}"
            )));
        }

        let payload: EventsResponse = response.json().await.map_err(|error| {
            CalendarError::Unavailable(format!("could not parse event list: {error}"))
        })?;

        let mut events = Vec::with_capacity(payload.items.len());
        for item in payload.items {
            let id = item.id.clone();
            match event_from_google(item) {
                Some(event) => events.push(event),
                None => warn!(event_id = %id, "skipping event without parseable times"),
            }
        }

        Ok(events)
    }

    async fn delete_event(&self, event_id: &str) -> Result<(), CalendarError> {
        let access_token = self.access_token().await?;
        let response = self
            .http
            .delete(format!("{}/{}", self.events_url(), event_id))
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|error| {
                CalendarError::Unavailable(format!("event delete request failed: {error}"))
            })?;

        let status = response.status();
        // Google answers 410 for events deleted earlier; treat both as gone.
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(CalendarError::NotFound(event_id.to_string()));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(CalendarError::Unavailable(format!(
                "event delete failed ({status}): {detail}"
            )));
        }

        Ok(())
    }
}

fn busy_periods_from(periods: &[BusyPeriod]) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    periods
        .iter()
        .filter_map(|period| {
            let start = parse_rfc3339(&period.start)?;
            let end = parse_rfc3339(&period.end)?;
            Some((start, end))
        })
        .collect()
}

fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value).ok().map(|parsed| parsed.with_timezone(&Utc))
}

fn event_from_google(event: GoogleEvent) -> Option<CalendarEvent> {
    let start = parse_event_time(&event.start)?;
    let end = parse_event_time(&event.end)?;
    let title = event
        .summary
        .filter(|summary| !summary.trim().is_empty())
        .unwrap_or_else(|| "(untitled)".to_string());

    Some(CalendarEvent {
        id: event.id,
        title,
        start_time: start,
        end_time: end,
        attendees: event
            .attendees
            .unwrap_or_default()
            .into_iter()
            .map(|attendee| attendee.email)
            .collect(),
        description: event.description,
    })
}

fn parse_event_time(value: &EventDateTime) -> Option<DateTime<Utc>> {
    if let Some(date_time) = &value.date_time {
        return parse_rfc3339(date_time);
    }
    // All-day events carry a bare date; pin it to midnight UTC.
    let date = value.date.as_deref()?;
    let naive = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(DateTime::from_naive_utc_and_offset(naive.and_hms_opt(0, 0, 0)?, Utc))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Serialize)]
struct FreeBusyRequest {
    #[serde(rename = "timeMin")]
    time_min: String,
    #[serde(rename = "timeMax")]
    time_max: String,
    items: Vec<FreeBusyItem>,
}

#[derive(Debug, Serialize)]
struct FreeBusyItem {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: std::collections::HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<BusyPeriod>,
}

#[derive(Debug, Deserialize)]
struct BusyPeriod {
    start: String,
    end: String,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<GoogleEvent>,
}

#[derive(Debug, Deserialize)]
struct GoogleEvent {
    id: String,
    summary: Option<String>,
    description: Option<String>,
    start: EventDateTime,
    end: EventDateTime,
    attendees: Option<Vec<GoogleAttendee>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EventDateTime {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GoogleAttendee {
    email: String,
}

#[derive(Debug, Serialize)]
struct InsertEventRequest {
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    start: EventDateTime,
    end: EventDateTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attendees: Vec<GoogleAttendee>,
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{event_from_google, EventDateTime, FreeBusyResponse, GoogleEvent};

    #[test]
    fn free_busy_response_deserializes_google_shape() {
        let payload: FreeBusyResponse = serde_json::from_str(
            r#"{
                "kind": "calendar#freeBusy",
                "calendars": {
                    "primary": {
                        "busy": [
                            {"start": "2026-03-02T10:00:00Z", "end": "2026-03-02T11:00:00Z"}
                        ]
                    }
                }
            }"#,
        )
        .expect("free/busy payload should deserialize");

        let calendar = payload.calendars.get("primary").expect("calendar entry");
        assert_eq!(calendar.busy.len(), 1);
        assert_eq!(calendar.busy[0].start, "2026-03-02T10:00:00Z");
    }

    #[test]
    fn timed_event_converts_with_attendees() {
        let event: GoogleEvent = serde_json::from_str(
            r#"{
                "id": "evt-123",
                "summary": "Planning",
                "start": {"dateTime": "2026-03-02T14:00:00Z"},
                "end": {"dateTime": "2026-03-02T14:30:00Z"},
                "attendees": [{"email": "ana@example.com"}]
            }"#,
        )
        .expect("event should deserialize");

        let converted = event_from_google(event).expect("event should convert");
        assert_eq!(converted.id, "evt-123");
        assert_eq!(converted.title, "Planning");
        assert_eq!(converted.start_time, Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap());
        assert_eq!(converted.attendees, vec!["ana@example.com".to_string()]);
    }

    #[test]
    fn all_day_event_is_pinned_to_midnight() {
        let event = GoogleEvent {
            id: "evt-allday".to_string(),
            summary: None,
            description: None,
            start: EventDateTime { date_time: None, date: Some("2026-03-02".to_string()) },
            end: EventDateTime { date_time: None, date: Some("2026-03-03".to_string()) },
            attendees: None,
        };

        let converted = event_from_google(event).expect("all-day event should convert");
        assert_eq!(converted.title, "(untitled)");
        assert_eq!(converted.start_time, Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn event_without_times_is_dropped() {
        let event = GoogleEvent {
            id: "evt-bad".to_string(),
            summary: Some("broken".to_string()),
            description: None,
            start: EventDateTime { date_time: None, date: None },
            end: EventDateTime { date_time: None, date: None },
            attendees: None,
        };

        assert!(event_from_google(event).is_none());
    }
}
