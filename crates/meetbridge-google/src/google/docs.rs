//! Google Docs API v1 client, with Drive v3 for listing and search.

use serde_json::{json, Value};
use tracing::{debug, info};

use super::client::GoogleClient;
use super::common::{extract_array, opt_string, pointer_i64, pointer_str, str_or_na};
use super::types::{CreatedDocument, Document, DocumentSummary};
use crate::config::ApiEndpoints;
use crate::error::{Error, OperationContext, Result};

const DOCUMENT_QUERY: &str = "mimeType='application/vnd.google-apps.document' and trashed=false";
const FILE_FIELDS: &str = "files(id,name,modifiedTime,webViewLink)";

pub struct DocsClient {
    client: GoogleClient,
    endpoints: ApiEndpoints,
}

super::google_api_wrapper!(DocsClient);

impl DocsClient {
    fn document_url(&self, document_id: &str) -> String {
        format!("{}/documents/{}", self.endpoints.docs, document_id)
    }

    async fn list_files(&self, q: String, limit: usize) -> Result<Vec<DocumentSummary>> {
        let query = vec![
            ("q", q),
            ("pageSize", limit.to_string()),
            ("orderBy", "modifiedTime desc".to_string()),
            ("fields", FILE_FIELDS.to_string()),
        ];
        let response = self
            .client
            .get(&format!("{}/files", self.endpoints.drive), &query)
            .await?;

        let docs: Vec<DocumentSummary> = extract_array(&response, "files")
            .iter()
            .take(limit)
            .map(DocumentSummary::from_api)
            .collect();
        debug!("Retrieved {} documents", docs.len());
        Ok(docs)
    }

    /// Most recently modified documents.
    pub async fn list_docs(&self, limit: usize) -> Result<Vec<DocumentSummary>> {
        info!("Listing documents (limit {})", limit);
        self.list_files(DOCUMENT_QUERY.to_string(), limit)
            .await
            .operation("list docs")
    }

    /// Documents whose name or full text contains `search`.
    pub async fn search_docs(&self, search: &str, limit: usize) -> Result<Vec<DocumentSummary>> {
        info!("Searching documents (limit {})", limit);
        let term = escape_query_term(search);
        let q = format!(
            "{} and (name contains '{}' or fullText contains '{}')",
            DOCUMENT_QUERY, term, term
        );
        self.list_files(q, limit).await.operation("search docs")
    }

    pub async fn get_doc(&self, document_id: &str) -> Result<Document> {
        info!("Fetching document: {}", document_id);

        let response = self
            .client
            .get(&self.document_url(document_id), &[])
            .await
            .operation("get doc")?;
        Ok(parse_document(&response))
    }

    /// Create a document, inserting `content` at the start when given.
    pub async fn create_doc(&self, title: &str, content: Option<&str>) -> Result<CreatedDocument> {
        info!("Creating document: {}", title);

        let response = self
            .client
            .post(&format!("{}/documents", self.endpoints.docs), &json!({"title": title}))
            .await
            .operation("create doc")?;

        let document_id = str_or_na(&response, "/documentId");
        let created = CreatedDocument {
            url: CreatedDocument::edit_url(&document_id),
            title: opt_string(&response, "/title").unwrap_or_else(|| title.to_string()),
            document_id,
        };

        if let Some(text) = content.filter(|t| !t.is_empty()) {
            // The document already exists at this point; report it with the failure.
            self.insert_text(&created.document_id, 1, text)
                .await
                .map_err(|e| Error::Failed {
                    operation: "create doc",
                    detail: format!(
                        "document {} was created but inserting its content failed: {}",
                        created.document_id, e
                    ),
                })?;
        }

        info!("Created document {}", created.document_id);
        Ok(created)
    }

    /// Append `text` before the document's trailing newline. Returns the
    /// index the text was inserted at.
    pub async fn append_to_doc(&self, document_id: &str, text: &str) -> Result<i64> {
        info!("Appending to document: {}", document_id);

        let response = self
            .client
            .get(&self.document_url(document_id), &[])
            .await
            .operation("append to doc")?;
        let index = append_index(parse_document(&response).end_index);

        self.insert_text(document_id, index, text)
            .await
            .operation("append to doc")?;
        Ok(index)
    }

    /// Replace every occurrence of `search`; returns how many changed.
    pub async fn replace_in_doc(
        &self,
        document_id: &str,
        search: &str,
        replacement: &str,
        match_case: bool,
    ) -> Result<i64> {
        info!("Replacing text in document: {}", document_id);

        let requests = json!([{
            "replaceAllText": {
                "containsText": {"text": search, "matchCase": match_case},
                "replaceText": replacement
            }
        }]);
        let response = self
            .batch_update(document_id, requests)
            .await
            .operation("replace in doc")?;

        let changed = pointer_i64(&response, "/replies/0/replaceAllText/occurrencesChanged").unwrap_or(0);
        debug!("Replaced {} occurrence(s)", changed);
        Ok(changed)
    }

    async fn insert_text(&self, document_id: &str, index: i64, text: &str) -> Result<Value> {
        let requests = json!([{
            "insertText": {"location": {"index": index}, "text": text}
        }]);
        self.batch_update(document_id, requests).await
    }

    async fn batch_update(&self, document_id: &str, requests: Value) -> Result<Value> {
        let url = format!("{}:batchUpdate", self.document_url(document_id));
        self.client.post(&url, &json!({"requests": requests})).await
    }
}

/// Quote a Drive query term: backslashes first, then single quotes.
fn escape_query_term(term: &str) -> String {
    term.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Insert before the implicit trailing newline, never before index 1.
fn append_index(end_index: i64) -> i64 {
    (end_index - 1).max(1)
}

/// Concatenated paragraph text runs; tables and section breaks contribute
/// nothing.
pub fn extract_text(document: &Value) -> String {
    let mut text = String::new();
    let content = document
        .get("body")
        .map(|body| extract_array(body, "content"))
        .unwrap_or_default();
    for element in content {
        let Some(paragraph) = element.get("paragraph") else {
            continue;
        };
        for run in extract_array(paragraph, "elements") {
            if let Some(content) = pointer_str(&run, "/textRun/content") {
                text.push_str(content);
            }
        }
    }
    text
}

fn parse_document(raw: &Value) -> Document {
    let end_index = raw
        .pointer("/body/content")
        .and_then(|c| c.as_array())
        .and_then(|c| c.last())
        .and_then(|last| pointer_i64(last, "/endIndex"))
        .unwrap_or(1);

    Document {
        document_id: str_or_na(raw, "/documentId"),
        title: opt_string(raw, "/title").unwrap_or_else(|| "(Untitled)".to_string()),
        revision_id: opt_string(raw, "/revisionId"),
        text: extract_text(raw),
        end_index,
    }
}
