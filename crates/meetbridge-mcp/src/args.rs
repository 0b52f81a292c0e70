//! Argument validation: untyped `tools/call` arguments into one typed
//! request per tool, with defaults applied.
//!
//! Every field problem is collected so the caller sees all of them at once.

use std::fmt;

use chrono_tz::Tz;
use meetbridge_google::google::calendar::parse_event_time;
use meetbridge_google::google::{NewEvent, OutgoingMessage};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::tools::{ToolKind, DEFAULT_LIMIT, MAX_MAIL_LIMIT, MAX_MEETING_LIMIT};

pub const MAX_DURATION_MINUTES: u64 = 1440;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@<>,;]+@[^\s@<>,;]+\.[^\s@<>,;]+$").expect("email pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub reason: String,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// All violated fields of one call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid arguments: {}", join_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(FieldIssue::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn mentions(&self, field: &str) -> bool {
        self.issues.iter().any(|i| i.field == field)
    }
}

/// Defaults that come from configuration rather than from the tool schema.
#[derive(Debug, Clone)]
pub struct ArgDefaults {
    pub timezone: String,
}

impl Default for ArgDefaults {
    fn default() -> Self {
        Self {
            timezone: meetbridge_google::config::DEFAULT_TIMEZONE.to_string(),
        }
    }
}

/// A validated call, one variant per tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    AuthStatus,
    Authenticate,
    ListConferences { limit: usize },
    GetConference { name: String },
    ListParticipants { conference_name: String },
    ListRecordings { conference_name: String },
    ListTranscripts { conference_name: String },
    GetTranscriptText { transcript_name: String },
    SummarizeTranscript { transcript_name: String },
    CreateMeeting,
    ListUpcomingMeetings { limit: usize },
    ListPastMeetings { limit: usize },
    CreateCalendarEvent(NewEvent),
    GmailProfile,
    ListLabels,
    ListEmails { limit: usize },
    SearchEmails { query: String, limit: usize },
    GetEmail { message_id: String },
    GetThread { thread_id: String },
    SendEmail(OutgoingMessage),
    CreateDraft(OutgoingMessage),
    TrashEmail { message_id: String },
    MarkAsRead { message_id: String },
    MarkAsUnread { message_id: String },
    ListDocs { limit: usize },
    SearchDocs { query: String, limit: usize },
    GetDoc { document_id: String },
    CreateDoc { title: String, content: Option<String> },
    AppendToDoc { document_id: String, text: String },
    ReplaceInDoc {
        document_id: String,
        search_text: String,
        replace_text: String,
        match_case: bool,
    },
}

impl ToolRequest {
    pub fn decode(kind: ToolKind, arguments: &Value, defaults: &ArgDefaults) -> Result<Self, ValidationError> {
        let mut args = ArgReader::new(arguments);

        let request = match kind {
            ToolKind::AuthStatus => Self::AuthStatus,
            ToolKind::Authenticate => Self::Authenticate,
            ToolKind::ListConferences => Self::ListConferences {
                limit: args.limit(MAX_MEETING_LIMIT),
            },
            ToolKind::GetConference => Self::GetConference {
                name: args.required_str("name"),
            },
            ToolKind::ListParticipants => Self::ListParticipants {
                conference_name: args.required_str("conference_name"),
            },
            ToolKind::ListRecordings => Self::ListRecordings {
                conference_name: args.required_str("conference_name"),
            },
            ToolKind::ListTranscripts => Self::ListTranscripts {
                conference_name: args.required_str("conference_name"),
            },
            ToolKind::GetTranscriptText => Self::GetTranscriptText {
                transcript_name: args.required_str("transcript_name"),
            },
            ToolKind::SummarizeTranscript => Self::SummarizeTranscript {
                transcript_name: args.required_str("transcript_name"),
            },
            ToolKind::CreateMeeting => Self::CreateMeeting,
            ToolKind::ListUpcomingMeetings => Self::ListUpcomingMeetings {
                limit: args.limit(MAX_MEETING_LIMIT),
            },
            ToolKind::ListPastMeetings => Self::ListPastMeetings {
                limit: args.limit(MAX_MEETING_LIMIT),
            },
            ToolKind::CreateCalendarEvent => Self::CreateCalendarEvent(NewEvent {
                summary: args.required_str("summary"),
                start_time: args.event_time("start_time", true).unwrap_or_default(),
                description: args.optional_str("description"),
                end_time: args.event_time("end_time", false),
                duration_minutes: args
                    .optional_int("duration_minutes", 1, MAX_DURATION_MINUTES)
                    .map(|m| m as i64),
                attendees: args.emails("attendees", false),
                location: args.optional_str("location"),
                timezone: args.timezone("timezone", &defaults.timezone),
                add_meet_link: args.bool_or("add_meet_link", true),
            }),
            ToolKind::GmailProfile => Self::GmailProfile,
            ToolKind::ListLabels => Self::ListLabels,
            ToolKind::ListEmails => Self::ListEmails {
                limit: args.limit(MAX_MAIL_LIMIT),
            },
            ToolKind::SearchEmails => Self::SearchEmails {
                query: args.required_str("query"),
                limit: args.limit(MAX_MAIL_LIMIT),
            },
            ToolKind::GetEmail => Self::GetEmail {
                message_id: args.required_str("message_id"),
            },
            ToolKind::GetThread => Self::GetThread {
                thread_id: args.required_str("thread_id"),
            },
            ToolKind::SendEmail => Self::SendEmail(args.outgoing()),
            ToolKind::CreateDraft => Self::CreateDraft(args.outgoing()),
            ToolKind::TrashEmail => Self::TrashEmail {
                message_id: args.required_str("message_id"),
            },
            ToolKind::MarkAsRead => Self::MarkAsRead {
                message_id: args.required_str("message_id"),
            },
            ToolKind::MarkAsUnread => Self::MarkAsUnread {
                message_id: args.required_str("message_id"),
            },
            ToolKind::ListDocs => Self::ListDocs {
                limit: args.limit(MAX_MAIL_LIMIT),
            },
            ToolKind::SearchDocs => Self::SearchDocs {
                query: args.required_str("query"),
                limit: args.limit(MAX_MAIL_LIMIT),
            },
            ToolKind::GetDoc => Self::GetDoc {
                document_id: args.required_str("document_id"),
            },
            ToolKind::CreateDoc => Self::CreateDoc {
                title: args.required_str("title"),
                content: args.optional_str("content"),
            },
            ToolKind::AppendToDoc => Self::AppendToDoc {
                document_id: args.required_str("document_id"),
                text: args.required_str("text"),
            },
            ToolKind::ReplaceInDoc => Self::ReplaceInDoc {
                document_id: args.required_str("document_id"),
                search_text: args.required_str("search_text"),
                // Empty replacement deletes the matches.
                replace_text: args.required_string_allow_empty("replace_text"),
                match_case: args.bool_or("match_case", false),
            },
        };

        args.finish(request)
    }
}

/// Reads fields out of the argument object, recording every problem.
/// Accessors return a placeholder on failure; `finish` discards the
/// request whenever an issue was recorded.
struct ArgReader<'a> {
    fields: Option<&'a Map<String, Value>>,
    issues: Vec<FieldIssue>,
}

impl<'a> ArgReader<'a> {
    fn new(arguments: &'a Value) -> Self {
        let mut reader = Self {
            fields: arguments.as_object(),
            issues: Vec::new(),
        };
        if !arguments.is_null() && !arguments.is_object() {
            reader.issue("arguments", "must be an object");
        }
        reader
    }

    fn issue(&mut self, field: &str, reason: impl Into<String>) {
        self.issues.push(FieldIssue {
            field: field.to_string(),
            reason: reason.into(),
        });
    }

    /// Present, non-null value of `field`.
    fn get(&self, field: &str) -> Option<&'a Value> {
        self.fields
            .and_then(|f| f.get(field))
            .filter(|v| !v.is_null())
    }

    fn string(&mut self, field: &str) -> Option<String> {
        match self.get(field) {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.issue(field, "must be a string");
                None
            }
        }
    }

    fn required_str(&mut self, field: &str) -> String {
        match self.get(field) {
            None => {
                self.issue(field, "is required");
                String::new()
            }
            Some(_) => match self.string(field) {
                Some(s) if s.trim().is_empty() => {
                    self.issue(field, "must not be empty");
                    String::new()
                }
                Some(s) => s,
                None => String::new(),
            },
        }
    }

    fn required_string_allow_empty(&mut self, field: &str) -> String {
        if self.get(field).is_none() {
            self.issue(field, "is required");
            return String::new();
        }
        self.string(field).unwrap_or_default()
    }

    fn optional_str(&mut self, field: &str) -> Option<String> {
        self.string(field).filter(|s| !s.trim().is_empty())
    }

    fn optional_int(&mut self, field: &str, min: u64, max: u64) -> Option<u64> {
        let value = self.get(field)?;
        let Some(n) = value
            .as_u64()
            .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
        else {
            if value.as_i64().is_some_and(|n| n < 0) || value.as_f64().is_some_and(|f| f < 0.0) {
                self.issue(field, format!("must be at least {}", min));
            } else {
                self.issue(field, "must be an integer");
            }
            return None;
        };
        if n < min {
            self.issue(field, format!("must be at least {}", min));
            return None;
        }
        if n > max {
            self.issue(field, format!("must be at most {}", max));
            return None;
        }
        Some(n)
    }

    fn limit(&mut self, max: u64) -> usize {
        self.optional_int("limit", 1, max).unwrap_or(DEFAULT_LIMIT) as usize
    }

    fn bool_or(&mut self, field: &str, default: bool) -> bool {
        match self.get(field) {
            None => default,
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                self.issue(field, "must be a boolean");
                default
            }
        }
    }

    /// A single address, a comma-separated string, or an array of addresses.
    fn emails(&mut self, field: &str, required: bool) -> Vec<String> {
        let raw: Vec<String> = match self.get(field) {
            None => Vec::new(),
            Some(Value::String(s)) => s
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            Some(Value::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item.as_str() {
                        Some(s) => out.push(s.trim().to_string()),
                        None => {
                            self.issue(field, "must contain only strings");
                            return Vec::new();
                        }
                    }
                }
                out
            }
            Some(_) => {
                self.issue(field, "must be an email address or a list of email addresses");
                return Vec::new();
            }
        };

        if raw.is_empty() {
            if required {
                self.issue(field, "is required");
            }
            return Vec::new();
        }

        let invalid: Vec<&String> = raw.iter().filter(|a| !EMAIL_RE.is_match(a)).collect();
        if !invalid.is_empty() {
            let listed = invalid.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ");
            self.issue(field, format!("invalid email address: {}", listed));
            return Vec::new();
        }
        raw
    }

    fn timezone(&mut self, field: &str, default: &str) -> String {
        match self.optional_str(field) {
            None => default.to_string(),
            Some(tz) => {
                if tz.parse::<Tz>().is_err() {
                    self.issue(field, format!("unknown timezone '{}'", tz));
                }
                tz
            }
        }
    }

    fn event_time(&mut self, field: &str, required: bool) -> Option<String> {
        let value = if required {
            Some(self.required_str(field)).filter(|s| !s.is_empty())
        } else {
            self.optional_str(field)
        }?;
        if parse_event_time(&value).is_none() {
            self.issue(
                field,
                "must be ISO 8601, 'YYYY-MM-DD HH:mm' or 'YYYY-MM-DD h:mm AM/PM'",
            );
            return None;
        }
        Some(value)
    }

    /// Single-line header value.
    fn header_str(&mut self, field: &str) -> String {
        let value = self.required_str(field);
        if value.contains(['\r', '\n']) {
            self.issue(field, "must not contain line breaks");
        }
        value
    }

    fn outgoing(&mut self) -> OutgoingMessage {
        OutgoingMessage {
            to: self.emails("to", true),
            subject: self.header_str("subject"),
            body: self.required_string_allow_empty("body"),
            cc: self.emails("cc", false),
            bcc: self.emails("bcc", false),
        }
    }

    fn finish<T>(self, value: T) -> Result<T, ValidationError> {
        if self.issues.is_empty() {
            Ok(value)
        } else {
            Err(ValidationError {
                issues: self.issues,
            })
        }
    }
}
