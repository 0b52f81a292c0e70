//! Gmail API v1 client.
//!
//! - Profile and labels
//! - List/search messages (metadata) and fetch full messages/threads
//! - Send and draft plain-text mail
//! - Trash and read/unread state

use serde_json::{json, Value};
use tracing::{debug, info};

use super::client::GoogleClient;
use super::common::{
    base64_url_decode, base64_url_encode, build_raw_message, extract_array, pointer_str,
    str_or_na, NOT_AVAILABLE,
};
use super::types::{Draft, Label, Message, Profile, SentMessage, Thread};
use crate::config::ApiEndpoints;
use crate::error::{OperationContext, Result};

const UNREAD_LABEL: &str = "UNREAD";
const INBOX_LABEL: &str = "INBOX";
const SUMMARY_HEADERS: &[&str] = &["From", "To", "Cc", "Subject", "Date"];

pub struct GmailClient {
    client: GoogleClient,
    endpoints: ApiEndpoints,
}

super::google_api_wrapper!(GmailClient);

/// Outgoing plain-text message for send/draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
}

impl OutgoingMessage {
    fn encoded(&self) -> String {
        let raw = build_raw_message(&self.to, &self.subject, &self.body, &self.cc, &self.bcc);
        base64_url_encode(raw.as_bytes())
    }
}

impl GmailClient {
    fn url(&self, path: &str) -> String {
        format!("{}/users/me/{}", self.endpoints.gmail, path)
    }

    pub async fn get_profile(&self) -> Result<Profile> {
        info!("Fetching Gmail profile");

        let response = self
            .client
            .get(&self.url("profile"), &[])
            .await
            .operation("get profile")?;
        Ok(Profile::from_api(&response))
    }

    pub async fn list_labels(&self) -> Result<Vec<Label>> {
        info!("Listing Gmail labels");

        let response = self
            .client
            .get(&self.url("labels"), &[])
            .await
            .operation("list labels")?;
        let labels: Vec<Label> = extract_array(&response, "labels")
            .iter()
            .map(Label::from_api)
            .collect();

        debug!("Retrieved {} labels", labels.len());
        Ok(labels)
    }

    /// Most recent inbox messages, headers only.
    pub async fn list_emails(&self, limit: usize) -> Result<Vec<Message>> {
        info!("Listing inbox messages (limit {})", limit);

        let query = vec![
            ("labelIds", INBOX_LABEL.to_string()),
            ("maxResults", limit.to_string()),
        ];
        self.list_with_metadata(&query, limit)
            .await
            .operation("list emails")
    }

    /// Messages matching a Gmail search query, headers only.
    pub async fn search_emails(&self, search: &str, limit: usize) -> Result<Vec<Message>> {
        info!("Searching Gmail messages (limit {})", limit);

        let query = vec![("q", search.to_string()), ("maxResults", limit.to_string())];
        self.list_with_metadata(&query, limit)
            .await
            .operation("search emails")
    }

    async fn list_with_metadata(&self, query: &[(&str, String)], limit: usize) -> Result<Vec<Message>> {
        let response = self.client.get(&self.url("messages"), query).await?;
        let ids: Vec<String> = extract_array(&response, "messages")
            .iter()
            .filter_map(|m| pointer_str(m, "/id").map(str::to_string))
            .take(limit)
            .collect();

        let mut messages = Vec::with_capacity(ids.len());
        for id in &ids {
            let mut metadata_query = vec![("format", "metadata".to_string())];
            metadata_query.extend(SUMMARY_HEADERS.iter().map(|h| ("metadataHeaders", h.to_string())));
            let raw = self
                .client
                .get(&self.url(&format!("messages/{}", id)), &metadata_query)
                .await?;
            messages.push(parse_message(&raw));
        }

        debug!("Retrieved {} messages", messages.len());
        Ok(messages)
    }

    pub async fn get_email(&self, message_id: &str) -> Result<Message> {
        info!("Fetching Gmail message: {}", message_id);

        let response = self
            .client
            .get(
                &self.url(&format!("messages/{}", message_id)),
                &[("format", "full".to_string())],
            )
            .await
            .operation("get email")?;
        Ok(parse_message(&response))
    }

    pub async fn get_thread(&self, thread_id: &str) -> Result<Thread> {
        info!("Fetching Gmail thread: {}", thread_id);

        let response = self
            .client
            .get(
                &self.url(&format!("threads/{}", thread_id)),
                &[("format", "full".to_string())],
            )
            .await
            .operation("get thread")?;

        Ok(Thread {
            id: str_or_na(&response, "/id"),
            messages: extract_array(&response, "messages")
                .iter()
                .map(parse_message)
                .collect(),
        })
    }

    pub async fn send_email(&self, message: &OutgoingMessage) -> Result<SentMessage> {
        info!("Sending Gmail message to {} recipient(s)", message.to.len());

        let response = self
            .client
            .post(&self.url("messages/send"), &json!({"raw": message.encoded()}))
            .await
            .operation("send email")?;

        let sent = SentMessage {
            id: str_or_na(&response, "/id"),
            thread_id: str_or_na(&response, "/threadId"),
        };
        info!("Message sent: {}", sent.id);
        Ok(sent)
    }

    pub async fn create_draft(&self, message: &OutgoingMessage) -> Result<Draft> {
        info!("Creating Gmail draft");

        let response = self
            .client
            .post(
                &self.url("drafts"),
                &json!({"message": {"raw": message.encoded()}}),
            )
            .await
            .operation("create draft")?;

        Ok(Draft {
            id: str_or_na(&response, "/id"),
            message_id: str_or_na(&response, "/message/id"),
        })
    }

    pub async fn trash_email(&self, message_id: &str) -> Result<()> {
        info!("Trashing message: {}", message_id);

        self.client
            .post(&self.url(&format!("messages/{}/trash", message_id)), &json!({}))
            .await
            .operation("trash email")?;
        Ok(())
    }

    pub async fn mark_as_read(&self, message_id: &str) -> Result<()> {
        self.modify_unread(message_id, json!({"removeLabelIds": [UNREAD_LABEL]}))
            .await
            .operation("mark as read")
    }

    pub async fn mark_as_unread(&self, message_id: &str) -> Result<()> {
        self.modify_unread(message_id, json!({"addLabelIds": [UNREAD_LABEL]}))
            .await
            .operation("mark as unread")
    }

    async fn modify_unread(&self, message_id: &str, body: Value) -> Result<()> {
        info!("Modifying labels for message: {}", message_id);

        self.client
            .post(&self.url(&format!("messages/{}/modify", message_id)), &body)
            .await?;
        Ok(())
    }
}

fn header(message: &Value, name: &str) -> Option<String> {
    message
        .get("payload")
        .map(|payload| extract_array(payload, "headers"))
        .unwrap_or_default()
        .iter()
        .find(|h| pointer_str(h, "/name").is_some_and(|n| n.eq_ignore_ascii_case(name)))
        .and_then(|h| pointer_str(h, "/value").map(str::to_string))
}

/// Plain-text body: top-level body data first, then the first `text/plain`
/// part with data, then the first part carrying any data.
pub fn extract_body(payload: &Value) -> String {
    if let Some(data) = pointer_str(payload, "/body/data").filter(|d| !d.is_empty()) {
        return base64_url_decode(data).unwrap_or_default();
    }

    let parts = extract_array(payload, "parts");
    let part_data = |part: &Value| {
        pointer_str(part, "/body/data")
            .filter(|d| !d.is_empty())
            .map(str::to_string)
    };

    let chosen = parts
        .iter()
        .find(|p| pointer_str(p, "/mimeType") == Some("text/plain") && part_data(p).is_some())
        .or_else(|| parts.iter().find(|p| part_data(p).is_some()));

    chosen
        .and_then(part_data)
        .and_then(|data| base64_url_decode(&data))
        .unwrap_or_default()
}

fn parse_message(raw: &Value) -> Message {
    let na = || NOT_AVAILABLE.to_string();
    Message {
        id: str_or_na(raw, "/id"),
        thread_id: str_or_na(raw, "/threadId"),
        from: header(raw, "From").unwrap_or_else(na),
        to: header(raw, "To").unwrap_or_else(na),
        cc: header(raw, "Cc"),
        subject: header(raw, "Subject").unwrap_or_else(|| "(No subject)".to_string()),
        date: header(raw, "Date").unwrap_or_else(na),
        snippet: pointer_str(raw, "/snippet").unwrap_or_default().to_string(),
        body: raw.get("payload").map(extract_body).unwrap_or_default(),
        label_ids: extract_array(raw, "labelIds")
            .iter()
            .filter_map(|l| l.as_str().map(str::to_string))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credential;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GmailClient {
        GmailClient::new(
            Credential::from_access_token("t"),
            &ApiEndpoints::rooted_at(&server.uri()),
        )
        .unwrap()
    }

    fn outgoing() -> OutgoingMessage {
        OutgoingMessage {
            to: vec!["a@example.com".into()],
            subject: "Hello".into(),
            body: "Hi there".into(),
            cc: vec![],
            bcc: vec!["b@example.com".into()],
        }
    }

    #[test]
    fn test_extract_body_prefers_top_level() {
        let payload = json!({
            "mimeType": "text/plain",
            "body": {"data": base64_url_encode(b"top level")},
            "parts": [{"mimeType": "text/plain", "body": {"data": base64_url_encode(b"part")}}]
        });
        assert_eq!(extract_body(&payload), "top level");
    }

    #[test]
    fn test_extract_body_prefers_plain_part() {
        let payload = json!({
            "mimeType": "multipart/alternative",
            "body": {"size": 0},
            "parts": [
                {"mimeType": "text/html", "body": {"data": base64_url_encode(b"<p>html</p>")}},
                {"mimeType": "text/plain", "body": {"size": 0}},
                {"mimeType": "text/plain", "body": {"data": base64_url_encode(b"plain")}}
            ]
        });
        assert_eq!(extract_body(&payload), "plain");
    }

    #[test]
    fn test_extract_body_falls_back_to_any_part() {
        let payload = json!({
            "parts": [
                {"mimeType": "text/plain", "body": {}},
                {"mimeType": "text/html", "body": {"data": base64_url_encode(b"<b>x</b>")}}
            ]
        });
        assert_eq!(extract_body(&payload), "<b>x</b>");
        assert_eq!(extract_body(&json!({})), "");
    }

    #[test]
    fn test_parse_message_headers_case_insensitive() {
        let raw = json!({
            "id": "m1",
            "threadId": "t1",
            "labelIds": ["INBOX", "UNREAD"],
            "payload": {"headers": [
                {"name": "from", "value": "Asha <asha@example.com>"},
                {"name": "Subject", "value": "Notes"}
            ]}
        });
        let message = parse_message(&raw);
        assert_eq!(message.from, "Asha <asha@example.com>");
        assert_eq!(message.subject, "Notes");
        assert_eq!(message.to, "N/A");
        assert!(message.is_unread());
    }

    #[test]
    fn test_outgoing_encoding_round_trips_headers() {
        let encoded = outgoing().encoded();
        assert!(!encoded.contains('='));
        let decoded = base64_url_decode(&encoded).unwrap();
        assert_eq!(
            decoded,
            "To: a@example.com\r\nSubject: Hello\r\nBcc: b@example.com\r\n\r\nHi there"
        );
    }

    #[tokio::test]
    async fn test_list_emails_fetches_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .and(query_param("labelIds", "INBOX"))
            .and(query_param("maxResults", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [{"id": "m1", "threadId": "t1"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages/m1"))
            .and(query_param("format", "metadata"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "m1",
                "threadId": "t1",
                "snippet": "See you",
                "payload": {"headers": [{"name": "Subject", "value": "Lunch"}]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let messages = client_for(&server).list_emails(10).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].subject, "Lunch");
        assert_eq!(messages[0].snippet, "See you");
    }

    #[tokio::test]
    async fn test_send_posts_raw_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gmail/v1/users/me/messages/send"))
            .and(body_json(json!({"raw": outgoing().encoded()})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "s1", "threadId": "t9"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sent = client_for(&server).send_email(&outgoing()).await.unwrap();
        assert_eq!(sent.id, "s1");
        assert_eq!(sent.thread_id, "t9");
    }

    #[tokio::test]
    async fn test_mark_as_read_removes_unread() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gmail/v1/users/me/messages/m1/modify"))
            .and(body_json(json!({"removeLabelIds": ["UNREAD"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "m1"})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).mark_as_read("m1").await.unwrap();
    }

    #[tokio::test]
    async fn test_trash_failure_names_operation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gmail/v1/users/me/messages/gone/trash"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": 404, "message": "Requested entity was not found."}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).trash_email("gone").await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to trash email: "));
    }
}
