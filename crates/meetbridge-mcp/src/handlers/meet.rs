//! Meet and Calendar tool handlers.

use meetbridge_google::google::types::{CalendarEvent, Conference, TranscriptSummary};
use meetbridge_google::google::NewEvent;
use meetbridge_google::{MeetClient, Result};
use meetbridge_protocol::ToolCallResult;

use super::common::{bullet, join_blocks, or_na};

pub async fn list_conferences(client: &MeetClient, limit: usize) -> Result<ToolCallResult> {
    let conferences = client.list_conferences(limit).await?;
    if conferences.is_empty() {
        return Ok(ToolCallResult::text("No conference records found."));
    }

    let blocks = conferences.iter().map(format_conference);
    Ok(ToolCallResult::text(format!(
        "Found {} conference record(s):\n\n{}",
        conferences.len(),
        join_blocks(blocks)
    )))
}

pub async fn get_conference(client: &MeetClient, name: &str) -> Result<ToolCallResult> {
    let conference = client.get_conference(name).await?;
    Ok(ToolCallResult::text(format_conference(&conference)))
}

fn format_conference(c: &Conference) -> String {
    [
        bullet("Name", &c.name),
        bullet("Space", &c.space),
        bullet("Started", &c.start_time),
        bullet("Ended", or_na(c.end_time.as_deref())),
    ]
    .join("\n")
}

pub async fn list_participants(client: &MeetClient, conference_name: &str) -> Result<ToolCallResult> {
    let participants = client.list_participants(conference_name).await?;
    if participants.is_empty() {
        return Ok(ToolCallResult::text(format!(
            "No participants found for {}.",
            conference_name
        )));
    }

    let blocks = participants.iter().map(|p| {
        [
            format!("{} ({})", p.display_name, p.kind),
            bullet("Participant", &p.name),
            bullet("Joined", &p.earliest_start_time),
            bullet("Left", or_na(p.latest_end_time.as_deref())),
        ]
        .join("\n")
    });
    Ok(ToolCallResult::text(format!(
        "{} participant(s) in {}:\n\n{}",
        participants.len(),
        conference_name,
        join_blocks(blocks)
    )))
}

pub async fn list_recordings(client: &MeetClient, conference_name: &str) -> Result<ToolCallResult> {
    let recordings = client.list_recordings(conference_name).await?;
    if recordings.is_empty() {
        return Ok(ToolCallResult::text(format!(
            "No recordings found for {}.",
            conference_name
        )));
    }

    let blocks = recordings.iter().map(|r| {
        [
            bullet("Recording", &r.name),
            bullet("State", &r.state),
            bullet("Started", &r.start_time),
            bullet("Ended", or_na(r.end_time.as_deref())),
            bullet("Drive file", or_na(r.drive_file.as_deref())),
            bullet("Link", or_na(r.export_uri.as_deref())),
        ]
        .join("\n")
    });
    Ok(ToolCallResult::text(format!(
        "{} recording(s) in {}:\n\n{}",
        recordings.len(),
        conference_name,
        join_blocks(blocks)
    )))
}

pub async fn list_transcripts(client: &MeetClient, conference_name: &str) -> Result<ToolCallResult> {
    let transcripts = client.list_transcripts(conference_name).await?;
    if transcripts.is_empty() {
        return Ok(ToolCallResult::text(format!(
            "No transcripts found for {}.",
            conference_name
        )));
    }

    let blocks = transcripts.iter().map(|t| {
        [
            bullet("Transcript", &t.name),
            bullet("State", &t.state),
            bullet("Started", &t.start_time),
            bullet("Ended", or_na(t.end_time.as_deref())),
            bullet("Document", or_na(t.document.as_deref())),
            bullet("Link", or_na(t.export_uri.as_deref())),
        ]
        .join("\n")
    });
    Ok(ToolCallResult::text(format!(
        "{} transcript(s) in {}:\n\n{}\n\nUse get_transcript_text with a transcript name to read it.",
        transcripts.len(),
        conference_name,
        join_blocks(blocks)
    )))
}

pub async fn get_transcript_text(client: &MeetClient, transcript_name: &str) -> Result<ToolCallResult> {
    let lines = client.get_transcript_text(transcript_name).await?;
    if lines.is_empty() {
        return Ok(ToolCallResult::text(format!(
            "Transcript {} has no entries.",
            transcript_name
        )));
    }

    let body = lines
        .iter()
        .map(|l| format!("[{}] {}: {}", l.time, l.speaker, l.text))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(ToolCallResult::segments([
        format!("Transcript {} ({} entries):", transcript_name, lines.len()),
        body,
    ]))
}

pub async fn summarize_transcript(client: &MeetClient, transcript_name: &str) -> Result<ToolCallResult> {
    let summary = client.summarize_transcript(transcript_name).await?;
    Ok(ToolCallResult::text(format_summary(&summary)))
}

fn format_summary(s: &TranscriptSummary) -> String {
    if s.entry_count == 0 {
        return format!("Transcript {} has no entries to summarize.", s.transcript);
    }

    let mut out = vec![
        format!("Summary of {}", s.transcript),
        bullet("Entries", s.entry_count.to_string()),
        bullet("Words", s.word_count.to_string()),
        bullet("From", or_na(s.first_time.as_deref())),
        bullet("To", or_na(s.last_time.as_deref())),
    ];
    if let Some(minutes) = s.duration_minutes {
        out.push(bullet("Duration", format!("{} min", minutes)));
    }

    out.push(String::new());
    out.push("Speakers:".to_string());
    for speaker in &s.speakers {
        let share = if s.word_count == 0 {
            0
        } else {
            speaker.words * 100 / s.word_count
        };
        out.push(format!(
            "- {}: {} entries, {} words ({}%)",
            speaker.speaker, speaker.entries, speaker.words, share
        ));
    }

    out.push(String::new());
    out.push("Opening:".to_string());
    for line in &s.opening {
        out.push(format!("[{}] {}: {}", line.time, line.speaker, line.text));
    }
    out.join("\n")
}

pub async fn create_meeting(client: &MeetClient) -> Result<ToolCallResult> {
    let space = client.create_meeting().await?;
    Ok(ToolCallResult::text(format!(
        "Meeting created.\n{}\n{}\n{}",
        bullet("Join link", &space.meeting_uri),
        bullet("Meeting code", &space.meeting_code),
        bullet("Space", &space.name)
    )))
}

pub async fn list_upcoming_meetings(client: &MeetClient, limit: usize) -> Result<ToolCallResult> {
    let events = client.list_upcoming_meetings(limit).await?;
    Ok(format_events("upcoming", &events))
}

pub async fn list_past_meetings(client: &MeetClient, limit: usize) -> Result<ToolCallResult> {
    let events = client.list_past_meetings(limit).await?;
    Ok(format_events("past", &events))
}

fn format_events(which: &str, events: &[CalendarEvent]) -> ToolCallResult {
    if events.is_empty() {
        return ToolCallResult::text(format!("No {} Google Meet meetings found.", which));
    }

    let blocks = events.iter().map(format_event);
    ToolCallResult::text(format!(
        "Found {} {} meeting(s):\n\n{}",
        events.len(),
        which,
        join_blocks(blocks)
    ))
}

fn format_event(e: &CalendarEvent) -> String {
    let mut lines = vec![
        e.summary.clone(),
        bullet("Event ID", &e.id),
        bullet("Start", &e.start),
        bullet("End", &e.end),
        bullet("Meet link", or_na(e.join_link.as_deref())),
    ];
    if let Some(organizer) = &e.organizer {
        lines.push(bullet("Organizer", organizer));
    }
    if !e.attendees.is_empty() {
        lines.push(bullet("Attendees", e.attendees.join(", ")));
    }
    if let Some(location) = &e.location {
        lines.push(bullet("Location", location));
    }
    lines.join("\n")
}

pub async fn create_calendar_event(client: &MeetClient, event: &NewEvent) -> Result<ToolCallResult> {
    let created = client.create_calendar_event(event).await?;

    let mut text = format!("Event created.\n{}", format_event(&created));
    if let Some(link) = &created.html_link {
        text.push_str(&format!("\n{}", bullet("Calendar link", link)));
    }
    if !event.attendees.is_empty() {
        text.push_str(&format!("\nInvitations sent to {} attendee(s).", event.attendees.len()));
    }
    Ok(ToolCallResult::text(text))
}
