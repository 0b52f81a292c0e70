//! Authenticated HTTP client for Google REST APIs.
//!
//! Injects the credential's bearer token, maps Google error bodies and rate
//! limiting onto [`Error`], and follows `nextPageToken` pagination.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::auth::Credential;
use crate::error::{Error, Result};

pub struct GoogleClient {
    client: Client,
    credential: Credential,
}

impl GoogleClient {
    pub fn new(credential: Credential) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { client, credential })
    }

    pub async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        let builder = self.client.get(url).query(query);
        self.execute_request(builder).await
    }

    pub async fn post(&self, url: &str, body: &Value) -> Result<Value> {
        let builder = self.client.post(url).json(body);
        self.execute_request(builder).await
    }

    /// POST with query parameters, e.g. Calendar's `conferenceDataVersion`.
    pub async fn post_with_query(
        &self,
        url: &str,
        query: &[(&str, String)],
        body: &Value,
    ) -> Result<Value> {
        let builder = self.client.post(url).query(query).json(body);
        self.execute_request(builder).await
    }

    async fn execute_request(&self, builder: RequestBuilder) -> Result<Value> {
        let token = self.credential.access_token().await?;
        debug!("Executing Google API request");

        let response = builder.bearer_auth(token).send().await?;
        let status = response.status();
        debug!("Response status: {}", status);

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Rate limited by Google API");
            return Err(Error::RateLimited);
        }

        let body = response.text().await?;

        // Empty successful responses (e.g. trash/modify acknowledgements)
        if status.is_success() && body.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        if !status.is_success() {
            let message = extract_error_message(&body, status);
            error!("Google API error {}: {}", status.as_u16(), message);
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Collect `items_field` across pages until exhausted or `max_items`
    /// have been gathered. The caller puts any page-size parameter in
    /// `base_query`.
    pub async fn get_paginated(
        &self,
        url: &str,
        base_query: &[(&str, String)],
        items_field: &str,
        max_items: Option<usize>,
    ) -> Result<Vec<Value>> {
        let mut all_items = Vec::new();
        let mut page_token: Option<String> = None;
        let remaining = max_items.unwrap_or(usize::MAX);

        loop {
            let mut query = base_query.to_vec();
            if let Some(ref token) = page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self.get(url, &query).await?;

            if let Some(items) = response.get(items_field).and_then(|v| v.as_array()) {
                all_items.extend(items.iter().cloned());
                if all_items.len() >= remaining {
                    all_items.truncate(remaining);
                    break;
                }
            }

            match response.get("nextPageToken").and_then(|v| v.as_str()) {
                Some(next) if !next.is_empty() => page_token = Some(next.to_string()),
                _ => break,
            }
        }

        Ok(all_items)
    }
}

/// Google error bodies look like `{"error": {"code": 400, "message": "..."}}`;
/// OAuth-style endpoints sometimes use `{"error": "...", "error_description": "..."}`.
fn extract_error_message(body: &str, status: StatusCode) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    if let Some(error_value) = parsed.as_ref().and_then(|v| v.get("error")) {
        if let Some(message) = error_value.get("message").and_then(|v| v.as_str()) {
            return message.to_string();
        }
        if let Some(code) = error_value.as_str() {
            let description = parsed
                .as_ref()
                .and_then(|v| v.get("error_description"))
                .and_then(|v| v.as_str());
            return match description {
                Some(d) => format!("{}: {}", code, d),
                None => code.to_string(),
            };
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {} error", status)
    } else {
        trimmed.chars().take(200).collect()
    }
}
