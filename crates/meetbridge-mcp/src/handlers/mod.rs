//! Per-domain result formatters. Each handler calls one service-client
//! operation and renders its result as text segments that keep the
//! resource names and ids needed by follow-up calls.

pub mod auth;
pub mod common;
pub mod docs;
pub mod gmail;
pub mod meet;

use meetbridge_google::{Error, Result, Session, Workspace};
use meetbridge_protocol::ToolCallResult;

use crate::args::ToolRequest;

/// Run a validated request. Credential tools talk to the session; every
/// other tool runs against the current workspace.
pub async fn run(request: ToolRequest, session: &Session) -> Result<ToolCallResult> {
    let workspace = match &request {
        ToolRequest::AuthStatus => return auth::status(session).await,
        ToolRequest::Authenticate => return auth::authenticate(session).await,
        _ => session.ensure_authenticated().await?,
    };
    call_service(request, &workspace).await
}

async fn call_service(request: ToolRequest, ws: &Workspace) -> Result<ToolCallResult> {
    match request {
        ToolRequest::ListConferences { limit } => meet::list_conferences(ws.meet()?, limit).await,
        ToolRequest::GetConference { name } => meet::get_conference(ws.meet()?, &name).await,
        ToolRequest::ListParticipants { conference_name } => {
            meet::list_participants(ws.meet()?, &conference_name).await
        }
        ToolRequest::ListRecordings { conference_name } => {
            meet::list_recordings(ws.meet()?, &conference_name).await
        }
        ToolRequest::ListTranscripts { conference_name } => {
            meet::list_transcripts(ws.meet()?, &conference_name).await
        }
        ToolRequest::GetTranscriptText { transcript_name } => {
            meet::get_transcript_text(ws.meet()?, &transcript_name).await
        }
        ToolRequest::SummarizeTranscript { transcript_name } => {
            meet::summarize_transcript(ws.meet()?, &transcript_name).await
        }
        ToolRequest::CreateMeeting => meet::create_meeting(ws.meet()?).await,
        ToolRequest::ListUpcomingMeetings { limit } => {
            meet::list_upcoming_meetings(ws.meet()?, limit).await
        }
        ToolRequest::ListPastMeetings { limit } => {
            meet::list_past_meetings(ws.meet()?, limit).await
        }
        ToolRequest::CreateCalendarEvent(event) => {
            meet::create_calendar_event(ws.meet()?, &event).await
        }

        ToolRequest::GmailProfile => gmail::profile(ws.gmail()?).await,
        ToolRequest::ListLabels => gmail::list_labels(ws.gmail()?).await,
        ToolRequest::ListEmails { limit } => gmail::list_emails(ws.gmail()?, limit).await,
        ToolRequest::SearchEmails { query, limit } => {
            gmail::search_emails(ws.gmail()?, &query, limit).await
        }
        ToolRequest::GetEmail { message_id } => gmail::get_email(ws.gmail()?, &message_id).await,
        ToolRequest::GetThread { thread_id } => gmail::get_thread(ws.gmail()?, &thread_id).await,
        ToolRequest::SendEmail(message) => gmail::send_email(ws.gmail()?, &message).await,
        ToolRequest::CreateDraft(message) => gmail::create_draft(ws.gmail()?, &message).await,
        ToolRequest::TrashEmail { message_id } => {
            gmail::trash_email(ws.gmail()?, &message_id).await
        }
        ToolRequest::MarkAsRead { message_id } => {
            gmail::mark_as_read(ws.gmail()?, &message_id).await
        }
        ToolRequest::MarkAsUnread { message_id } => {
            gmail::mark_as_unread(ws.gmail()?, &message_id).await
        }

        ToolRequest::ListDocs { limit } => docs::list_docs(ws.docs()?, limit).await,
        ToolRequest::SearchDocs { query, limit } => {
            docs::search_docs(ws.docs()?, &query, limit).await
        }
        ToolRequest::GetDoc { document_id } => docs::get_doc(ws.docs()?, &document_id).await,
        ToolRequest::CreateDoc { title, content } => {
            docs::create_doc(ws.docs()?, &title, content.as_deref()).await
        }
        ToolRequest::AppendToDoc { document_id, text } => {
            docs::append_to_doc(ws.docs()?, &document_id, &text).await
        }
        ToolRequest::ReplaceInDoc {
            document_id,
            search_text,
            replace_text,
            match_case,
        } => {
            docs::replace_in_doc(ws.docs()?, &document_id, &search_text, &replace_text, match_case)
                .await
        }

        ToolRequest::AuthStatus | ToolRequest::Authenticate => Err(Error::Failed {
            operation: "run tool",
            detail: "credential tools are handled by the session".to_string(),
        }),
    }
}
