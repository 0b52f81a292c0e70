//! Docs tool handlers.

use meetbridge_google::google::types::{CreatedDocument, DocumentSummary};
use meetbridge_google::{DocsClient, Result};
use meetbridge_protocol::ToolCallResult;

use super::common::{bullet, join_blocks};

pub async fn list_docs(client: &DocsClient, limit: usize) -> Result<ToolCallResult> {
    let docs = client.list_docs(limit).await?;
    Ok(format_doc_list("No documents found.", &docs))
}

pub async fn search_docs(client: &DocsClient, query: &str, limit: usize) -> Result<ToolCallResult> {
    let docs = client.search_docs(query, limit).await?;
    Ok(format_doc_list(
        &format!("No documents found matching \"{}\".", query),
        &docs,
    ))
}

fn format_doc_list(empty: &str, docs: &[DocumentSummary]) -> ToolCallResult {
    if docs.is_empty() {
        return ToolCallResult::text(empty);
    }

    let blocks = docs.iter().map(|d| {
        let link = d
            .web_view_link
            .clone()
            .unwrap_or_else(|| CreatedDocument::edit_url(&d.id));
        [
            d.name.clone(),
            bullet("Document ID", &d.id),
            bullet("Modified", &d.modified_time),
            bullet("Link", link),
        ]
        .join("\n")
    });
    ToolCallResult::text(format!(
        "Found {} document(s):\n\n{}",
        docs.len(),
        join_blocks(blocks)
    ))
}

pub async fn get_doc(client: &DocsClient, document_id: &str) -> Result<ToolCallResult> {
    let doc = client.get_doc(document_id).await?;

    let text = if doc.text.trim().is_empty() {
        "(Empty document)".to_string()
    } else {
        doc.text.trim_end().to_string()
    };
    Ok(ToolCallResult::segments([
        format!("{}\n{}", doc.title, bullet("Document ID", &doc.document_id)),
        text,
    ]))
}

pub async fn create_doc(client: &DocsClient, title: &str, content: Option<&str>) -> Result<ToolCallResult> {
    let created = client.create_doc(title, content).await?;
    Ok(ToolCallResult::text(format!(
        "Document created: {}\n{}\n{}",
        created.title,
        bullet("Document ID", &created.document_id),
        bullet("Link", &created.url)
    )))
}

pub async fn append_to_doc(client: &DocsClient, document_id: &str, text: &str) -> Result<ToolCallResult> {
    let index = client.append_to_doc(document_id, text).await?;
    Ok(ToolCallResult::text(format!(
        "Appended {} character(s) to document {} at index {}.",
        text.chars().count(),
        document_id,
        index
    )))
}

pub async fn replace_in_doc(
    client: &DocsClient,
    document_id: &str,
    search: &str,
    replacement: &str,
    match_case: bool,
) -> Result<ToolCallResult> {
    let changed = client
        .replace_in_doc(document_id, search, replacement, match_case)
        .await?;
    Ok(ToolCallResult::text(format!(
        "Replaced {} occurrence(s) of \"{}\" in document {}.",
        changed, search, document_id
    )))
}
