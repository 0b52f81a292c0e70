//! Gmail tool handlers.

use meetbridge_google::google::types::Message;
use meetbridge_google::google::OutgoingMessage;
use meetbridge_google::{GmailClient, Result};
use meetbridge_protocol::ToolCallResult;

use super::common::{bullet, join_blocks, truncate};

/// Per-message body cap inside a thread view.
const THREAD_BODY_CHARS: usize = 2000;

pub async fn profile(client: &GmailClient) -> Result<ToolCallResult> {
    let profile = client.get_profile().await?;
    Ok(ToolCallResult::text(format!(
        "Gmail account {}\n{}\n{}",
        profile.email,
        bullet("Messages", profile.messages_total.to_string()),
        bullet("Threads", profile.threads_total.to_string())
    )))
}

pub async fn list_labels(client: &GmailClient) -> Result<ToolCallResult> {
    let labels = client.list_labels().await?;
    if labels.is_empty() {
        return Ok(ToolCallResult::text("No labels found."));
    }

    let lines = labels
        .iter()
        .map(|l| format!("- {} ({}, id {})", l.name, l.kind, l.id))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(ToolCallResult::text(format!("{} label(s):\n{}", labels.len(), lines)))
}

pub async fn list_emails(client: &GmailClient, limit: usize) -> Result<ToolCallResult> {
    let messages = client.list_emails(limit).await?;
    Ok(format_message_list("No emails found in the inbox.", &messages))
}

pub async fn search_emails(client: &GmailClient, query: &str, limit: usize) -> Result<ToolCallResult> {
    let messages = client.search_emails(query, limit).await?;
    Ok(format_message_list(
        &format!("No emails found matching \"{}\".", query),
        &messages,
    ))
}

fn format_message_list(empty: &str, messages: &[Message]) -> ToolCallResult {
    if messages.is_empty() {
        return ToolCallResult::text(empty);
    }

    let blocks = messages.iter().map(format_summary);
    ToolCallResult::text(format!(
        "Found {} email(s):\n\n{}",
        messages.len(),
        join_blocks(blocks)
    ))
}

fn format_summary(m: &Message) -> String {
    let marker = if m.is_unread() { " [unread]" } else { "" };
    [
        format!("{}{}", m.subject, marker),
        bullet("From", &m.from),
        bullet("Date", &m.date),
        bullet("Message ID", &m.id),
        bullet("Thread ID", &m.thread_id),
        bullet("Snippet", &m.snippet),
    ]
    .join("\n")
}

fn format_full(m: &Message, body_limit: Option<usize>) -> String {
    let mut lines = vec![
        bullet("Subject", &m.subject),
        bullet("From", &m.from),
        bullet("To", &m.to),
    ];
    if let Some(cc) = &m.cc {
        lines.push(bullet("Cc", cc));
    }
    lines.push(bullet("Date", &m.date));
    lines.push(bullet("Message ID", &m.id));
    lines.push(bullet("Thread ID", &m.thread_id));
    if !m.label_ids.is_empty() {
        lines.push(bullet("Labels", m.label_ids.join(", ")));
    }

    let body = if m.body.trim().is_empty() {
        "(No plain-text body)".to_string()
    } else {
        match body_limit {
            Some(max) => truncate(&m.body, max),
            None => m.body.clone(),
        }
    };
    format!("{}\n\n{}", lines.join("\n"), body)
}

pub async fn get_email(client: &GmailClient, message_id: &str) -> Result<ToolCallResult> {
    let message = client.get_email(message_id).await?;
    Ok(ToolCallResult::text(format_full(&message, None)))
}

pub async fn get_thread(client: &GmailClient, thread_id: &str) -> Result<ToolCallResult> {
    let thread = client.get_thread(thread_id).await?;
    if thread.messages.is_empty() {
        return Ok(ToolCallResult::text(format!("Thread {} has no messages.", thread.id)));
    }

    let mut segments = vec![format!(
        "Thread {} ({} message(s)):",
        thread.id,
        thread.messages.len()
    )];
    segments.extend(
        thread
            .messages
            .iter()
            .map(|m| format_full(m, Some(THREAD_BODY_CHARS))),
    );
    Ok(ToolCallResult::segments(segments))
}

pub async fn send_email(client: &GmailClient, message: &OutgoingMessage) -> Result<ToolCallResult> {
    let sent = client.send_email(message).await?;
    Ok(ToolCallResult::text(format!(
        "Email sent to {}.\n{}\n{}",
        message.to.join(", "),
        bullet("Message ID", &sent.id),
        bullet("Thread ID", &sent.thread_id)
    )))
}

pub async fn create_draft(client: &GmailClient, message: &OutgoingMessage) -> Result<ToolCallResult> {
    let draft = client.create_draft(message).await?;
    Ok(ToolCallResult::text(format!(
        "Draft created for {}.\n{}\n{}",
        message.to.join(", "),
        bullet("Draft ID", &draft.id),
        bullet("Message ID", &draft.message_id)
    )))
}

pub async fn trash_email(client: &GmailClient, message_id: &str) -> Result<ToolCallResult> {
    client.trash_email(message_id).await?;
    Ok(ToolCallResult::text(format!("Message {} moved to trash.", message_id)))
}

pub async fn mark_as_read(client: &GmailClient, message_id: &str) -> Result<ToolCallResult> {
    client.mark_as_read(message_id).await?;
    Ok(ToolCallResult::text(format!("Message {} marked as read.", message_id)))
}

pub async fn mark_as_unread(client: &GmailClient, message_id: &str) -> Result<ToolCallResult> {
    client.mark_as_unread(message_id).await?;
    Ok(ToolCallResult::text(format!("Message {} marked as unread.", message_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body: &str, labels: &[&str]) -> Message {
        Message {
            id: "m1".into(),
            thread_id: "t1".into(),
            from: "a@example.com".into(),
            to: "me@example.com".into(),
            cc: None,
            subject: "Hello".into(),
            date: "Fri, 30 Jan 2026 10:00:00 +0000".into(),
            snippet: "Hi there".into(),
            body: body.into(),
            label_ids: labels.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[test]
    fn test_summary_carries_ids_and_unread_marker() {
        let text = format_summary(&message("", &["INBOX", "UNREAD"]));
        assert!(text.starts_with("Hello [unread]"));
        assert!(text.contains("Message ID: m1"));
        assert!(text.contains("Thread ID: t1"));
    }

    #[test]
    fn test_full_message_without_body() {
        let text = format_full(&message("  ", &[]), None);
        assert!(text.ends_with("(No plain-text body)"));
        assert!(!text.contains("Cc:"));
    }

    #[test]
    fn test_empty_list_message() {
        let result = format_message_list("No emails found in the inbox.", &[]);
        assert_eq!(result.joined_text(), "No emails found in the inbox.");
    }
}
