//! Google Calendar API v3: the Meet-backed view of the primary calendar.
//!
//! Listing keeps only events that are genuinely Google Meet meetings.
//! Creation accepts loosely formatted start times and can attach a fresh
//! Meet conference.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::common::{extract_array, pointer_str};
use super::meet::MeetClient;
use super::types::CalendarEvent;
use crate::error::{Error, OperationContext, Result};

pub const DEFAULT_DURATION_MINUTES: i64 = 60;
const PAST_WINDOW_DAYS: i64 = 30;
const MEET_SOLUTION_NAME: &str = "Google Meet";

/// Naive formats tried after RFC 3339, most specific first.
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %I:%M %p",
    "%Y-%m-%d %I:%M%p",
];

/// A parsed event time: either wall-clock in the event's timezone or an
/// absolute instant carrying its own offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    Local(NaiveDateTime),
    Offset(DateTime<FixedOffset>),
}

impl EventTime {
    fn plus_minutes(self, minutes: i64) -> Self {
        match self {
            Self::Local(t) => Self::Local(t + Duration::minutes(minutes)),
            Self::Offset(t) => Self::Offset(t + Duration::minutes(minutes)),
        }
    }

    /// `dateTime` value for the Calendar API.
    pub fn to_api_string(self) -> String {
        match self {
            Self::Local(t) => t.format("%Y-%m-%dT%H:%M:%S").to_string(),
            Self::Offset(t) => t.to_rfc3339(),
        }
    }
}

/// Parse ISO 8601 / RFC 3339, `YYYY-MM-DD HH:mm` and 12-hour variants.
pub fn parse_event_time(input: &str) -> Option<EventTime> {
    let input = input.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(input) {
        return Some(EventTime::Offset(t));
    }
    // Upper-case so "2:30 pm" matches %p.
    let normalized = input.to_uppercase();
    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&normalized, fmt).ok())
        .map(EventTime::Local)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventWindow {
    pub start: String,
    pub end: String,
}

/// Resolve start and end: an explicit end wins, otherwise start plus
/// `duration_minutes` (default 60).
pub fn resolve_event_window(
    start_time: &str,
    end_time: Option<&str>,
    duration_minutes: Option<i64>,
) -> Option<EventWindow> {
    let start = parse_event_time(start_time)?;
    let end = match end_time {
        Some(raw) => parse_event_time(raw)?,
        None => start.plus_minutes(duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES)),
    };
    Some(EventWindow {
        start: start.to_api_string(),
        end: end.to_api_string(),
    })
}

/// Event to create on the primary calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub summary: String,
    pub start_time: String,
    pub description: Option<String>,
    pub end_time: Option<String>,
    pub duration_minutes: Option<i64>,
    pub attendees: Vec<String>,
    pub location: Option<String>,
    pub timezone: String,
    pub add_meet_link: bool,
}

/// Meet-backed: conference solution named "Google Meet", or a direct
/// `hangoutLink`.
fn is_meet_event(event: &Value) -> bool {
    pointer_str(event, "/conferenceData/conferenceSolution/name") == Some(MEET_SOLUTION_NAME)
        || pointer_str(event, "/hangoutLink").is_some_and(|l| !l.is_empty())
}

/// Idempotency key for a conference create request.
fn conference_request_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("meetbridge-{}-{}", Utc::now().timestamp_millis(), suffix)
}

impl MeetClient {
    fn events_url(&self) -> String {
        format!("{}/calendars/primary/events", self.endpoints.calendar)
    }

    /// Over-fetch twice the limit, keep the Meet-backed events, truncate.
    async fn list_meet_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<CalendarEvent>> {
        let mut query = vec![
            ("timeMin", time_min.to_rfc3339()),
            ("maxResults", (limit * 2).to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        if let Some(max) = time_max {
            query.push(("timeMax", max.to_rfc3339()));
        }

        let response = self.client.get(&self.events_url(), &query).await?;
        let raw = extract_array(&response, "items");
        let events: Vec<CalendarEvent> = raw
            .iter()
            .filter(|e| is_meet_event(e))
            .take(limit)
            .map(CalendarEvent::from_api)
            .collect();

        debug!("Kept {} of {} calendar events as Meet meetings", events.len(), raw.len());
        Ok(events)
    }

    pub async fn list_upcoming_meetings(&self, limit: usize) -> Result<Vec<CalendarEvent>> {
        info!("Listing upcoming Meet meetings (limit {})", limit);
        self.list_meet_events(Utc::now(), None, limit)
            .await
            .operation("list upcoming meetings")
    }

    pub async fn list_past_meetings(&self, limit: usize) -> Result<Vec<CalendarEvent>> {
        info!("Listing past Meet meetings (limit {})", limit);
        let now = Utc::now();
        self.list_meet_events(now - Duration::days(PAST_WINDOW_DAYS), Some(now), limit)
            .await
            .operation("list past meetings")
    }

    pub async fn create_calendar_event(&self, event: &NewEvent) -> Result<CalendarEvent> {
        info!("Creating calendar event: {}", event.summary);

        let window = resolve_event_window(
            &event.start_time,
            event.end_time.as_deref(),
            event.duration_minutes,
        )
        .ok_or_else(|| Error::Failed {
            operation: "create calendar event",
            detail: format!("unrecognized start or end time '{}'", event.start_time),
        })?;

        let mut body = json!({
            "summary": event.summary,
            "start": {"dateTime": window.start, "timeZone": event.timezone},
            "end": {"dateTime": window.end, "timeZone": event.timezone},
        });
        if let Some(description) = &event.description {
            body["description"] = json!(description);
        }
        if let Some(location) = &event.location {
            body["location"] = json!(location);
        }
        if !event.attendees.is_empty() {
            body["attendees"] = event
                .attendees
                .iter()
                .map(|email| json!({"email": email}))
                .collect();
        }

        let mut query = Vec::new();
        if event.add_meet_link {
            body["conferenceData"] = json!({
                "createRequest": {
                    "requestId": conference_request_id(),
                    "conferenceSolutionKey": {"type": "hangoutsMeet"}
                }
            });
            query.push(("conferenceDataVersion", "1".to_string()));
        }
        let send_updates = if event.attendees.is_empty() { "none" } else { "all" };
        query.push(("sendUpdates", send_updates.to_string()));

        let response = self
            .client
            .post_with_query(&self.events_url(), &query, &body)
            .await
            .operation("create calendar event")?;
        let created = CalendarEvent::from_api(&response);

        info!("Created calendar event {}", created.id);
        Ok(created)
    }
}
