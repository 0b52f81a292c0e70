//! Tool registry: the static, ordered catalog answered by `tools/list`.

use std::collections::HashSet;

use meetbridge_protocol::{McpTool, ToolAnnotations, ToolsListResponse};
use serde_json::{json, Value};
use thiserror::Error;

pub const DEFAULT_LIMIT: u64 = 10;
/// Upper bound for conference and calendar listings.
pub const MAX_MEETING_LIMIT: u64 = 100;
/// Upper bound for mail and document listings.
pub const MAX_MAIL_LIMIT: u64 = 50;

/// Every tool the server exposes, in catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    AuthStatus,
    Authenticate,
    ListConferences,
    GetConference,
    ListParticipants,
    ListRecordings,
    ListTranscripts,
    GetTranscriptText,
    SummarizeTranscript,
    CreateMeeting,
    ListUpcomingMeetings,
    ListPastMeetings,
    CreateCalendarEvent,
    GmailProfile,
    ListLabels,
    ListEmails,
    SearchEmails,
    GetEmail,
    GetThread,
    SendEmail,
    CreateDraft,
    TrashEmail,
    MarkAsRead,
    MarkAsUnread,
    ListDocs,
    SearchDocs,
    GetDoc,
    CreateDoc,
    AppendToDoc,
    ReplaceInDoc,
}

impl ToolKind {
    pub const ALL: [ToolKind; 30] = [
        ToolKind::AuthStatus,
        ToolKind::Authenticate,
        ToolKind::ListConferences,
        ToolKind::GetConference,
        ToolKind::ListParticipants,
        ToolKind::ListRecordings,
        ToolKind::ListTranscripts,
        ToolKind::GetTranscriptText,
        ToolKind::SummarizeTranscript,
        ToolKind::CreateMeeting,
        ToolKind::ListUpcomingMeetings,
        ToolKind::ListPastMeetings,
        ToolKind::CreateCalendarEvent,
        ToolKind::GmailProfile,
        ToolKind::ListLabels,
        ToolKind::ListEmails,
        ToolKind::SearchEmails,
        ToolKind::GetEmail,
        ToolKind::GetThread,
        ToolKind::SendEmail,
        ToolKind::CreateDraft,
        ToolKind::TrashEmail,
        ToolKind::MarkAsRead,
        ToolKind::MarkAsUnread,
        ToolKind::ListDocs,
        ToolKind::SearchDocs,
        ToolKind::GetDoc,
        ToolKind::CreateDoc,
        ToolKind::AppendToDoc,
        ToolKind::ReplaceInDoc,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::AuthStatus => "auth_status",
            Self::Authenticate => "authenticate",
            Self::ListConferences => "list_conferences",
            Self::GetConference => "get_conference",
            Self::ListParticipants => "list_participants",
            Self::ListRecordings => "list_recordings",
            Self::ListTranscripts => "list_transcripts",
            Self::GetTranscriptText => "get_transcript_text",
            Self::SummarizeTranscript => "summarize_transcript",
            Self::CreateMeeting => "create_meeting",
            Self::ListUpcomingMeetings => "list_upcoming_meetings",
            Self::ListPastMeetings => "list_past_meetings",
            Self::CreateCalendarEvent => "create_calendar_event",
            Self::GmailProfile => "gmail_profile",
            Self::ListLabels => "list_labels",
            Self::ListEmails => "list_emails",
            Self::SearchEmails => "search_emails",
            Self::GetEmail => "get_email",
            Self::GetThread => "get_thread",
            Self::SendEmail => "send_email",
            Self::CreateDraft => "create_draft",
            Self::TrashEmail => "trash_email",
            Self::MarkAsRead => "mark_as_read",
            Self::MarkAsUnread => "mark_as_unread",
            Self::ListDocs => "list_docs",
            Self::SearchDocs => "search_docs",
            Self::GetDoc => "get_doc",
            Self::CreateDoc => "create_doc",
            Self::AppendToDoc => "append_to_doc",
            Self::ReplaceInDoc => "replace_in_doc",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// The two auth tools manage credentials themselves; everything else
    /// needs a live credential first.
    pub fn requires_auth(self) -> bool {
        !matches!(self, Self::AuthStatus | Self::Authenticate)
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::AuthStatus => "Check whether a Google account is connected and how.",
            Self::Authenticate => {
                "Connect a Google account. Opens a browser authorization flow when no stored token is usable."
            }
            Self::ListConferences => "List recent Google Meet conference records.",
            Self::GetConference => "Get details of a conference record by resource name (conferenceRecords/...).",
            Self::ListParticipants => "List participants of a conference record.",
            Self::ListRecordings => "List recordings of a conference record.",
            Self::ListTranscripts => "List transcripts of a conference record.",
            Self::GetTranscriptText => {
                "Get the full text of a transcript with speaker names (conferenceRecords/.../transcripts/...)."
            }
            Self::SummarizeTranscript => {
                "Summarize a transcript: length, time span, speaker contributions and opening lines."
            }
            Self::CreateMeeting => "Create a new Google Meet meeting space and return its join link.",
            Self::ListUpcomingMeetings => "List upcoming calendar events that have a Google Meet link.",
            Self::ListPastMeetings => "List calendar events with a Google Meet link from the last 30 days.",
            Self::CreateCalendarEvent => {
                "Create a calendar event, optionally with a Google Meet link and invitations."
            }
            Self::GmailProfile => "Get the Gmail address and mailbox totals.",
            Self::ListLabels => "List Gmail labels.",
            Self::ListEmails => "List recent inbox messages.",
            Self::SearchEmails => "Search messages with Gmail search syntax (e.g. from:alice is:unread).",
            Self::GetEmail => "Get a message with its headers and plain-text body.",
            Self::GetThread => "Get every message of a thread.",
            Self::SendEmail => "Send a plain-text email.",
            Self::CreateDraft => "Create a plain-text draft.",
            Self::TrashEmail => "Move a message to the trash.",
            Self::MarkAsRead => "Mark a message as read.",
            Self::MarkAsUnread => "Mark a message as unread.",
            Self::ListDocs => "List recently modified Google Docs.",
            Self::SearchDocs => "Search Google Docs by title or content.",
            Self::GetDoc => "Get a document's title and text content.",
            Self::CreateDoc => "Create a Google Doc, optionally with initial content.",
            Self::AppendToDoc => "Append text to the end of a document.",
            Self::ReplaceInDoc => "Replace all occurrences of a text in a document.",
        }
    }

    pub fn input_schema(self) -> Value {
        match self {
            Self::AuthStatus
            | Self::Authenticate
            | Self::CreateMeeting
            | Self::GmailProfile
            | Self::ListLabels => object(json!({}), &[]),
            Self::ListConferences | Self::ListUpcomingMeetings | Self::ListPastMeetings => {
                object(json!({"limit": limit_property(MAX_MEETING_LIMIT)}), &[])
            }
            Self::GetConference => object(
                json!({"name": string_property("Conference record name, e.g. conferenceRecords/abc-123")}),
                &["name"],
            ),
            Self::ListParticipants | Self::ListRecordings | Self::ListTranscripts => object(
                json!({"conference_name": string_property("Conference record name, e.g. conferenceRecords/abc-123")}),
                &["conference_name"],
            ),
            Self::GetTranscriptText | Self::SummarizeTranscript => object(
                json!({"transcript_name": string_property(
                    "Transcript name, e.g. conferenceRecords/abc-123/transcripts/xyz"
                )}),
                &["transcript_name"],
            ),
            Self::CreateCalendarEvent => object(
                json!({
                    "summary": string_property("Event title"),
                    "start_time": string_property(
                        "Start time: ISO 8601, 'YYYY-MM-DD HH:mm' or 'YYYY-MM-DD h:mm AM/PM'"
                    ),
                    "description": string_property("Event description"),
                    "end_time": string_property("End time, same formats as start_time"),
                    "duration_minutes": {
                        "type": "integer",
                        "description": "Duration when end_time is not given",
                        "minimum": 1,
                        "maximum": crate::args::MAX_DURATION_MINUTES,
                        "default": meetbridge_google::google::calendar::DEFAULT_DURATION_MINUTES
                    },
                    "attendees": {
                        "type": "array",
                        "items": {"type": "string", "format": "email"},
                        "description": "Attendee email addresses; invitations are sent when present"
                    },
                    "location": string_property("Event location"),
                    "timezone": {
                        "type": "string",
                        "description": "IANA timezone for start/end",
                        "default": meetbridge_google::config::DEFAULT_TIMEZONE
                    },
                    "add_meet_link": {
                        "type": "boolean",
                        "description": "Attach a Google Meet link",
                        "default": true
                    }
                }),
                &["summary", "start_time"],
            ),
            Self::ListEmails | Self::ListDocs => {
                object(json!({"limit": limit_property(MAX_MAIL_LIMIT)}), &[])
            }
            Self::SearchEmails => object(
                json!({
                    "query": string_property("Gmail search query"),
                    "limit": limit_property(MAX_MAIL_LIMIT)
                }),
                &["query"],
            ),
            Self::SearchDocs => object(
                json!({
                    "query": string_property("Text to find in titles or content"),
                    "limit": limit_property(MAX_MAIL_LIMIT)
                }),
                &["query"],
            ),
            Self::GetEmail | Self::TrashEmail | Self::MarkAsRead | Self::MarkAsUnread => object(
                json!({"message_id": string_property("Gmail message id")}),
                &["message_id"],
            ),
            Self::GetThread => object(
                json!({"thread_id": string_property("Gmail thread id")}),
                &["thread_id"],
            ),
            Self::SendEmail | Self::CreateDraft => object(
                json!({
                    "to": recipients_property("Recipient address(es)"),
                    "subject": string_property("Subject line"),
                    "body": string_property("Plain-text body"),
                    "cc": recipients_property("Cc address(es)"),
                    "bcc": recipients_property("Bcc address(es)")
                }),
                &["to", "subject", "body"],
            ),
            Self::GetDoc => object(
                json!({"document_id": string_property("Document id")}),
                &["document_id"],
            ),
            Self::CreateDoc => object(
                json!({
                    "title": string_property("Document title"),
                    "content": string_property("Initial text")
                }),
                &["title"],
            ),
            Self::AppendToDoc => object(
                json!({
                    "document_id": string_property("Document id"),
                    "text": string_property("Text to append")
                }),
                &["document_id", "text"],
            ),
            Self::ReplaceInDoc => object(
                json!({
                    "document_id": string_property("Document id"),
                    "search_text": string_property("Text to find"),
                    "replace_text": string_property("Replacement text"),
                    "match_case": {
                        "type": "boolean",
                        "description": "Case-sensitive matching",
                        "default": false
                    }
                }),
                &["document_id", "search_text", "replace_text"],
            ),
        }
    }

    pub fn annotations(self) -> ToolAnnotations {
        match self {
            Self::Authenticate
            | Self::CreateMeeting
            | Self::CreateCalendarEvent
            | Self::SendEmail
            | Self::CreateDraft
            | Self::MarkAsRead
            | Self::MarkAsUnread
            | Self::CreateDoc
            | Self::AppendToDoc => ToolAnnotations::mutating(false),
            Self::TrashEmail | Self::ReplaceInDoc => ToolAnnotations::mutating(true),
            _ => ToolAnnotations::read_only(),
        }
    }

    fn descriptor(self) -> McpTool {
        McpTool {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
            annotations: Some(self.annotations()),
        }
    }
}

fn object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

fn string_property(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

fn limit_property(max: u64) -> Value {
    json!({
        "type": "integer",
        "description": "Maximum number of results",
        "minimum": 1,
        "maximum": max,
        "default": DEFAULT_LIMIT
    })
}

fn recipients_property(description: &str) -> Value {
    json!({
        "description": description,
        "oneOf": [
            {"type": "string", "format": "email"},
            {"type": "array", "items": {"type": "string", "format": "email"}}
        ]
    })
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate tool name in registry: {0}")]
    Duplicate(String),
}

#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<McpTool>,
}

impl ToolRegistry {
    pub fn new() -> Result<Self, RegistryError> {
        Self::from_kinds(&ToolKind::ALL)
    }

    fn from_kinds(kinds: &[ToolKind]) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        let mut tools = Vec::with_capacity(kinds.len());
        for kind in kinds {
            if !seen.insert(kind.name()) {
                return Err(RegistryError::Duplicate(kind.name().to_string()));
            }
            tools.push(kind.descriptor());
        }
        Ok(Self { tools })
    }

    pub fn tools(&self) -> &[McpTool] {
        &self.tools
    }

    pub fn list_response(&self) -> ToolsListResponse {
        ToolsListResponse {
            tools: self.tools.clone(),
            next_cursor: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lists_every_tool_in_order() {
        let registry = ToolRegistry::new().unwrap();
        let names: Vec<&str> = registry.tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names.len(), 30);
        assert_eq!(names[0], "auth_status");
        assert_eq!(names[1], "authenticate");
        assert_eq!(names[29], "replace_in_doc");
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let err = ToolRegistry::from_kinds(&[ToolKind::GetDoc, ToolKind::GetDoc]).unwrap_err();
        assert_eq!(err.to_string(), "duplicate tool name in registry: get_doc");
    }

    #[test]
    fn test_name_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("delete_everything"), None);
    }

    #[test]
    fn test_schemas_declare_required_fields() {
        let schema = ToolKind::SendEmail.input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["to", "subject", "body"]));

        let schema = ToolKind::ListEmails.input_schema();
        assert_eq!(schema["properties"]["limit"]["maximum"], 50);
        assert_eq!(schema["properties"]["limit"]["default"], 10);

        let schema = ToolKind::ListConferences.input_schema();
        assert_eq!(schema["properties"]["limit"]["maximum"], 100);
    }

    #[test]
    fn test_annotations() {
        assert_eq!(ToolKind::ListDocs.annotations().read_only_hint, Some(true));
        assert_eq!(ToolKind::TrashEmail.annotations().destructive_hint, Some(true));
        assert_eq!(ToolKind::SendEmail.annotations().read_only_hint, Some(false));
        assert!(!ToolKind::AuthStatus.requires_auth());
        assert!(ToolKind::GetDoc.requires_auth());
    }
}
