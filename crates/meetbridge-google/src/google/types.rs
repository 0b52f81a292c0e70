//! Local projections of Google API responses.
//!
//! Every record is built from the raw JSON with missing optional fields
//! normalized to `N/A`, `None` or an empty collection.

use serde::Serialize;
use serde_json::Value;

use super::common::{extract_array, opt_string, pointer_i64, pointer_str, str_or_na, NOT_AVAILABLE};

// ── Meet ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conference {
    /// Resource name, `conferenceRecords/{id}`.
    pub name: String,
    pub space: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub expire_time: Option<String>,
}

impl Conference {
    pub(crate) fn from_api(v: &Value) -> Self {
        Self {
            name: str_or_na(v, "/name"),
            space: str_or_na(v, "/space"),
            start_time: str_or_na(v, "/startTime"),
            end_time: opt_string(v, "/endTime"),
            expire_time: opt_string(v, "/expireTime"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Participant {
    pub name: String,
    pub display_name: String,
    pub kind: &'static str,
    pub earliest_start_time: String,
    pub latest_end_time: Option<String>,
}

impl Participant {
    pub(crate) fn from_api(v: &Value) -> Self {
        let (kind, display_name) = if let Some(user) = v.get("signedinUser") {
            ("signed-in", opt_string(user, "/displayName"))
        } else if let Some(user) = v.get("anonymousUser") {
            ("anonymous", opt_string(user, "/displayName"))
        } else if let Some(user) = v.get("phoneUser") {
            ("phone", opt_string(user, "/displayName"))
        } else {
            ("unknown", None)
        };

        Self {
            name: str_or_na(v, "/name"),
            display_name: display_name.unwrap_or_else(|| "Unknown".to_string()),
            kind,
            earliest_start_time: str_or_na(v, "/earliestStartTime"),
            latest_end_time: opt_string(v, "/latestEndTime"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recording {
    pub name: String,
    pub state: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub drive_file: Option<String>,
    pub export_uri: Option<String>,
}

impl Recording {
    pub(crate) fn from_api(v: &Value) -> Self {
        Self {
            name: str_or_na(v, "/name"),
            state: str_or_na(v, "/state"),
            start_time: str_or_na(v, "/startTime"),
            end_time: opt_string(v, "/endTime"),
            drive_file: opt_string(v, "/driveDestination/file"),
            export_uri: opt_string(v, "/driveDestination/exportUri"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcript {
    pub name: String,
    pub state: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub document: Option<String>,
    pub export_uri: Option<String>,
}

impl Transcript {
    pub(crate) fn from_api(v: &Value) -> Self {
        Self {
            name: str_or_na(v, "/name"),
            state: str_or_na(v, "/state"),
            start_time: str_or_na(v, "/startTime"),
            end_time: opt_string(v, "/endTime"),
            document: opt_string(v, "/docsDestination/document"),
            export_uri: opt_string(v, "/docsDestination/exportUri"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    pub name: String,
    /// Participant resource name of the speaker.
    pub participant: String,
    pub text: String,
    pub language_code: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl TranscriptEntry {
    pub(crate) fn from_api(v: &Value) -> Self {
        Self {
            name: str_or_na(v, "/name"),
            participant: pointer_str(v, "/participant").unwrap_or_default().to_string(),
            text: pointer_str(v, "/text").unwrap_or_default().to_string(),
            language_code: opt_string(v, "/languageCode"),
            start_time: opt_string(v, "/startTime"),
            end_time: opt_string(v, "/endTime"),
        }
    }
}

/// One transcript line with the speaker resolved to a display name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpokenLine {
    /// `HH:MM:SS` in UTC, or `--:--:--` when the entry carries no time.
    pub time: String,
    pub speaker: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeakerStats {
    pub speaker: String,
    pub entries: usize,
    pub words: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptSummary {
    pub transcript: String,
    pub entry_count: usize,
    pub word_count: usize,
    pub first_time: Option<String>,
    pub last_time: Option<String>,
    pub duration_minutes: Option<i64>,
    /// Ordered by words spoken, most first.
    pub speakers: Vec<SpeakerStats>,
    pub opening: Vec<SpokenLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeetingSpace {
    pub name: String,
    pub meeting_uri: String,
    pub meeting_code: String,
}

impl MeetingSpace {
    pub(crate) fn from_api(v: &Value) -> Self {
        Self {
            name: str_or_na(v, "/name"),
            meeting_uri: str_or_na(v, "/meetingUri"),
            meeting_code: str_or_na(v, "/meetingCode"),
        }
    }
}

// ── Calendar ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    pub start: String,
    pub end: String,
    pub join_link: Option<String>,
    /// Conference solution name, e.g. "Google Meet".
    pub conference_solution: Option<String>,
    pub attendees: Vec<String>,
    pub organizer: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub html_link: Option<String>,
}

impl CalendarEvent {
    pub(crate) fn from_api(v: &Value) -> Self {
        let start = opt_string(v, "/start/dateTime")
            .or_else(|| opt_string(v, "/start/date"))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let end = opt_string(v, "/end/dateTime")
            .or_else(|| opt_string(v, "/end/date"))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        let video_entry = v
            .pointer("/conferenceData/entryPoints")
            .and_then(|e| e.as_array())
            .and_then(|points| {
                points
                    .iter()
                    .find(|p| pointer_str(p, "/entryPointType") == Some("video"))
                    .and_then(|p| opt_string(p, "/uri"))
            });

        let attendees = extract_array(v, "attendees")
            .iter()
            .filter_map(|a| opt_string(a, "/email"))
            .collect();

        Self {
            id: str_or_na(v, "/id"),
            summary: opt_string(v, "/summary").unwrap_or_else(|| "(No title)".to_string()),
            start,
            end,
            join_link: opt_string(v, "/hangoutLink").or(video_entry),
            conference_solution: opt_string(v, "/conferenceData/conferenceSolution/name"),
            attendees,
            organizer: opt_string(v, "/organizer/email"),
            location: opt_string(v, "/location"),
            description: opt_string(v, "/description"),
            html_link: opt_string(v, "/htmlLink"),
        }
    }
}

// ── Gmail ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub email: String,
    pub messages_total: i64,
    pub threads_total: i64,
}

impl Profile {
    pub(crate) fn from_api(v: &Value) -> Self {
        Self {
            email: str_or_na(v, "/emailAddress"),
            messages_total: pointer_i64(v, "/messagesTotal").unwrap_or(0),
            threads_total: pointer_i64(v, "/threadsTotal").unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Label {
    pub id: String,
    pub name: String,
    /// `system` or `user`.
    pub kind: String,
}

impl Label {
    pub(crate) fn from_api(v: &Value) -> Self {
        Self {
            id: str_or_na(v, "/id"),
            name: str_or_na(v, "/name"),
            kind: opt_string(v, "/type")
                .map(|t| t.to_lowercase())
                .unwrap_or_else(|| "user".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub from: String,
    pub to: String,
    pub cc: Option<String>,
    pub subject: String,
    pub date: String,
    pub snippet: String,
    /// Decoded plain-text body; empty for metadata-only fetches.
    pub body: String,
    pub label_ids: Vec<String>,
}

impl Message {
    pub fn is_unread(&self) -> bool {
        self.label_ids.iter().any(|l| l == "UNREAD")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thread {
    pub id: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Draft {
    pub id: String,
    pub message_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentMessage {
    pub id: String,
    pub thread_id: String,
}

// ── Docs / Drive ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub id: String,
    pub name: String,
    pub modified_time: String,
    pub web_view_link: Option<String>,
}

impl DocumentSummary {
    pub(crate) fn from_api(v: &Value) -> Self {
        Self {
            id: str_or_na(v, "/id"),
            name: opt_string(v, "/name").unwrap_or_else(|| "(Untitled)".to_string()),
            modified_time: str_or_na(v, "/modifiedTime"),
            web_view_link: opt_string(v, "/webViewLink"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub document_id: String,
    pub title: String,
    pub revision_id: Option<String>,
    /// Concatenated paragraph text runs.
    pub text: String,
    /// End index of the body's last structural element.
    pub end_index: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedDocument {
    pub document_id: String,
    pub title: String,
    pub url: String,
}

impl CreatedDocument {
    pub fn edit_url(document_id: &str) -> String {
        format!("https://docs.google.com/document/d/{}/edit", document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_participant_display_names() {
        let signed_in = Participant::from_api(&json!({
            "name": "conferenceRecords/c/participants/1",
            "signedinUser": {"user": "users/1", "displayName": "Asha"},
            "earliestStartTime": "2026-01-30T08:30:00Z"
        }));
        assert_eq!(signed_in.display_name, "Asha");
        assert_eq!(signed_in.kind, "signed-in");

        let phone = Participant::from_api(&json!({"phoneUser": {"displayName": "+91 ***"}}));
        assert_eq!(phone.display_name, "+91 ***");
        assert_eq!(phone.name, "N/A");

        let bare = Participant::from_api(&json!({}));
        assert_eq!(bare.display_name, "Unknown");
    }

    #[test]
    fn test_calendar_event_join_link_fallback() {
        let event = CalendarEvent::from_api(&json!({
            "id": "e1",
            "start": {"date": "2026-02-01"},
            "conferenceData": {
                "conferenceSolution": {"name": "Google Meet"},
                "entryPoints": [
                    {"entryPointType": "phone", "uri": "tel:+1"},
                    {"entryPointType": "video", "uri": "https://meet.google.com/abc-defg-hij"}
                ]
            },
            "attendees": [{"email": "a@example.com"}, {"displayName": "no email"}]
        }));
        assert_eq!(event.summary, "(No title)");
        assert_eq!(event.start, "2026-02-01");
        assert_eq!(event.end, "N/A");
        assert_eq!(event.join_link.as_deref(), Some("https://meet.google.com/abc-defg-hij"));
        assert_eq!(event.conference_solution.as_deref(), Some("Google Meet"));
        assert_eq!(event.attendees, vec!["a@example.com".to_string()]);
    }

    #[test]
    fn test_profile_accepts_string_counts() {
        let profile = Profile::from_api(&json!({
            "emailAddress": "me@example.com",
            "messagesTotal": 12,
            "threadsTotal": "7"
        }));
        assert_eq!(profile.messages_total, 12);
        assert_eq!(profile.threads_total, 7);
    }

    #[test]
    fn test_recording_and_transcript_destinations() {
        let recording = Recording::from_api(&json!({
            "name": "conferenceRecords/c/recordings/r",
            "state": "FILE_GENERATED",
            "driveDestination": {"file": "f1", "exportUri": "https://drive.google.com/f1"}
        }));
        assert_eq!(recording.drive_file.as_deref(), Some("f1"));
        assert_eq!(recording.start_time, "N/A");

        let transcript = Transcript::from_api(&json!({
            "name": "conferenceRecords/c/transcripts/t",
            "docsDestination": {"document": "d1"}
        }));
        assert_eq!(transcript.document.as_deref(), Some("d1"));
        assert_eq!(transcript.export_uri, None);
    }
}
