//! Google Meet REST API v2 client.
//!
//! Conference records and their artifacts (participants, recordings,
//! transcripts) plus meeting-space creation. The Calendar side of the same
//! client lives in [`super::calendar`].

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, info};

use super::client::GoogleClient;
use super::common::extract_array;
use super::types::{
    Conference, MeetingSpace, Participant, Recording, SpeakerStats, SpokenLine, Transcript,
    TranscriptEntry, TranscriptSummary,
};
use crate::config::ApiEndpoints;
use crate::error::{OperationContext, Result};

/// Page size used when walking artifact collections to completion.
const ARTIFACT_PAGE_SIZE: usize = 100;
/// Lines kept in a summary's opening excerpt.
const OPENING_LINES: usize = 5;

pub struct MeetClient {
    pub(super) client: GoogleClient,
    pub(super) endpoints: ApiEndpoints,
}

super::google_api_wrapper!(MeetClient);

impl MeetClient {
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoints.meet, path)
    }

    /// Most recent conference records, newest first.
    pub async fn list_conferences(&self, limit: usize) -> Result<Vec<Conference>> {
        info!("Listing conference records (limit {})", limit);

        let response = self
            .client
            .get(&self.url("conferenceRecords"), &[("pageSize", limit.to_string())])
            .await
            .operation("list conferences")?;

        let conferences: Vec<Conference> = extract_array(&response, "conferenceRecords")
            .iter()
            .take(limit)
            .map(Conference::from_api)
            .collect();

        debug!("Retrieved {} conference records", conferences.len());
        Ok(conferences)
    }

    pub async fn get_conference(&self, name: &str) -> Result<Conference> {
        info!("Fetching conference record: {}", name);

        let response = self
            .client
            .get(&self.url(name), &[])
            .await
            .operation("get conference")?;
        Ok(Conference::from_api(&response))
    }

    async fn list_artifacts(
        &self,
        parent: &str,
        collection: &str,
        items_field: &str,
    ) -> Result<Vec<Value>> {
        self.client
            .get_paginated(
                &self.url(&format!("{}/{}", parent, collection)),
                &[("pageSize", ARTIFACT_PAGE_SIZE.to_string())],
                items_field,
                None,
            )
            .await
    }

    pub async fn list_participants(&self, conference_name: &str) -> Result<Vec<Participant>> {
        info!("Listing participants of {}", conference_name);

        let items = self
            .list_artifacts(conference_name, "participants", "participants")
            .await
            .operation("list participants")?;
        Ok(items.iter().map(Participant::from_api).collect())
    }

    pub async fn list_recordings(&self, conference_name: &str) -> Result<Vec<Recording>> {
        info!("Listing recordings of {}", conference_name);

        let items = self
            .list_artifacts(conference_name, "recordings", "recordings")
            .await
            .operation("list recordings")?;
        Ok(items.iter().map(Recording::from_api).collect())
    }

    pub async fn list_transcripts(&self, conference_name: &str) -> Result<Vec<Transcript>> {
        info!("Listing transcripts of {}", conference_name);

        let items = self
            .list_artifacts(conference_name, "transcripts", "transcripts")
            .await
            .operation("list transcripts")?;
        Ok(items.iter().map(Transcript::from_api).collect())
    }

    /// Transcript rendered as speaker-attributed lines.
    pub async fn get_transcript_text(&self, transcript_name: &str) -> Result<Vec<SpokenLine>> {
        info!("Fetching transcript text of {}", transcript_name);

        let (entries, speakers) = self
            .transcript_parts(transcript_name)
            .await
            .operation("get transcript")?;
        Ok(render_lines(&entries, &speakers))
    }

    /// Local statistics over a transcript: size, span and who spoke most.
    pub async fn summarize_transcript(&self, transcript_name: &str) -> Result<TranscriptSummary> {
        info!("Summarizing {}", transcript_name);

        let (entries, speakers) = self
            .transcript_parts(transcript_name)
            .await
            .operation("summarize transcript")?;
        Ok(summarize(transcript_name, &entries, &speakers))
    }

    /// All entries of a transcript in spoken order, plus a participant
    /// resource name → display name map for its conference.
    async fn transcript_parts(
        &self,
        transcript_name: &str,
    ) -> Result<(Vec<TranscriptEntry>, HashMap<String, String>)> {
        let entries: Vec<TranscriptEntry> = self
            .list_artifacts(transcript_name, "entries", "transcriptEntries")
            .await?
            .iter()
            .map(TranscriptEntry::from_api)
            .collect();
        debug!("Retrieved {} transcript entries", entries.len());

        let Some(conference) = conference_of(transcript_name) else {
            return Ok((entries, HashMap::new()));
        };
        let speakers = self
            .list_artifacts(&conference, "participants", "participants")
            .await?
            .iter()
            .map(Participant::from_api)
            .map(|p| (p.name, p.display_name))
            .collect();
        Ok((entries, speakers))
    }

    /// Create a new meeting space with default settings.
    pub async fn create_meeting(&self) -> Result<MeetingSpace> {
        info!("Creating meeting space");

        let response = self
            .client
            .post(&self.url("spaces"), &json!({}))
            .await
            .operation("create meeting")?;
        let space = MeetingSpace::from_api(&response);

        info!("Created meeting space {}", space.name);
        Ok(space)
    }
}

/// `conferenceRecords/{c}/transcripts/{t}` → `conferenceRecords/{c}`.
fn conference_of(transcript_name: &str) -> Option<String> {
    let mut parts = transcript_name.split('/');
    match (parts.next(), parts.next()) {
        (Some("conferenceRecords"), Some(id)) if !id.is_empty() => {
            Some(format!("conferenceRecords/{}", id))
        }
        _ => None,
    }
}

fn parse_time(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
}

fn render_lines(entries: &[TranscriptEntry], speakers: &HashMap<String, String>) -> Vec<SpokenLine> {
    entries
        .iter()
        .map(|entry| SpokenLine {
            time: parse_time(entry.start_time.as_deref())
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "--:--:--".to_string()),
            speaker: speakers
                .get(&entry.participant)
                .cloned()
                .unwrap_or_else(|| "Unknown speaker".to_string()),
            text: entry.text.trim().to_string(),
        })
        .collect()
}

fn summarize(
    transcript_name: &str,
    entries: &[TranscriptEntry],
    speakers: &HashMap<String, String>,
) -> TranscriptSummary {
    let lines = render_lines(entries, speakers);

    let mut stats: Vec<SpeakerStats> = Vec::new();
    for line in &lines {
        let words = line.text.split_whitespace().count();
        match stats.iter_mut().find(|s| s.speaker == line.speaker) {
            Some(s) => {
                s.entries += 1;
                s.words += words;
            }
            None => stats.push(SpeakerStats {
                speaker: line.speaker.clone(),
                entries: 1,
                words,
            }),
        }
    }
    // Stable sort keeps first-spoken order among ties.
    stats.sort_by(|a, b| b.words.cmp(&a.words));

    let first = entries.iter().find_map(|e| parse_time(e.start_time.as_deref()));
    let last = entries
        .iter()
        .rev()
        .find_map(|e| parse_time(e.end_time.as_deref().or(e.start_time.as_deref())));

    TranscriptSummary {
        transcript: transcript_name.to_string(),
        entry_count: entries.len(),
        word_count: stats.iter().map(|s| s.words).sum(),
        first_time: first.map(|t| t.to_rfc3339()),
        last_time: last.map(|t| t.to_rfc3339()),
        duration_minutes: first
            .zip(last)
            .map(|(f, l)| l.signed_duration_since(f).num_minutes()),
        speakers: stats,
        opening: lines.into_iter().take(OPENING_LINES).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credential;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> MeetClient {
        MeetClient::new(
            Credential::from_access_token("t"),
            &ApiEndpoints::rooted_at(&server.uri()),
        )
        .unwrap()
    }

    fn entry(participant: &str, text: &str, start: &str, end: &str) -> TranscriptEntry {
        TranscriptEntry {
            name: "e".into(),
            participant: participant.into(),
            text: text.into(),
            language_code: None,
            start_time: Some(start.into()),
            end_time: Some(end.into()),
        }
    }

    #[test]
    fn test_conference_of() {
        assert_eq!(
            conference_of("conferenceRecords/abc/transcripts/t1").as_deref(),
            Some("conferenceRecords/abc")
        );
        assert_eq!(conference_of("transcripts/t1"), None);
    }

    #[test]
    fn test_summarize_orders_speakers_by_words() {
        let speakers = HashMap::from([
            ("p/1".to_string(), "Asha".to_string()),
            ("p/2".to_string(), "Ben".to_string()),
        ]);
        let entries = vec![
            entry("p/1", "hello there", "2026-01-30T08:30:00Z", "2026-01-30T08:30:05Z"),
            entry("p/2", "one two three four", "2026-01-30T08:31:00Z", "2026-01-30T08:31:10Z"),
            entry("p/3", "hi", "2026-01-30T08:40:00Z", "2026-01-30T08:45:00Z"),
        ];

        let summary = summarize("conferenceRecords/c/transcripts/t", &entries, &speakers);
        assert_eq!(summary.entry_count, 3);
        assert_eq!(summary.word_count, 7);
        assert_eq!(summary.duration_minutes, Some(15));
        assert_eq!(summary.speakers[0].speaker, "Ben");
        assert_eq!(summary.speakers[1].speaker, "Asha");
        assert_eq!(summary.speakers[2].speaker, "Unknown speaker");
        assert_eq!(summary.opening[0].time, "08:30:00");
    }

    #[tokio::test]
    async fn test_list_conferences_truncates_to_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/meet/v2/conferenceRecords"))
            .and(query_param("pageSize", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "conferenceRecords": [
                    {"name": "conferenceRecords/a", "space": "spaces/x", "startTime": "2026-01-30T08:30:00Z"},
                    {"name": "conferenceRecords/b"},
                    {"name": "conferenceRecords/c"}
                ]
            })))
            .mount(&server)
            .await;

        let conferences = client_for(&server).list_conferences(2).await.unwrap();
        assert_eq!(conferences.len(), 2);
        assert_eq!(conferences[0].space, "spaces/x");
        assert_eq!(conferences[1].start_time, "N/A");
    }

    #[tokio::test]
    async fn test_transcript_text_resolves_speakers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/meet/v2/conferenceRecords/c/transcripts/t/entries"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "transcriptEntries": [
                    {"name": "e1", "participant": "conferenceRecords/c/participants/p1",
                     "text": "Good morning", "startTime": "2026-01-30T09:05:07Z"}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/meet/v2/conferenceRecords/c/participants"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "participants": [
                    {"name": "conferenceRecords/c/participants/p1",
                     "signedinUser": {"displayName": "Asha"}}
                ]
            })))
            .mount(&server)
            .await;

        let lines = client_for(&server)
            .get_transcript_text("conferenceRecords/c/transcripts/t")
            .await
            .unwrap();
        assert_eq!(
            lines,
            vec![SpokenLine {
                time: "09:05:07".into(),
                speaker: "Asha".into(),
                text: "Good morning".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_get_conference_error_names_operation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/meet/v2/conferenceRecords/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": 404, "message": "Requested entity was not found."}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_conference("conferenceRecords/missing")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to get conference: Google API error 404: Requested entity was not found."
        );
    }

    #[tokio::test]
    async fn test_create_meeting() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/meet/v2/spaces"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "spaces/jQCFfuBOdN5z",
                "meetingUri": "https://meet.google.com/abc-mnop-xyz",
                "meetingCode": "abc-mnop-xyz"
            })))
            .mount(&server)
            .await;

        let space = client_for(&server).create_meeting().await.unwrap();
        assert_eq!(space.meeting_code, "abc-mnop-xyz");
    }
}
