//! `auth_status` and `authenticate`.

use meetbridge_google::{Result, Session};
use meetbridge_protocol::ToolCallResult;
use tracing::info;

pub async fn status(session: &Session) -> Result<ToolCallResult> {
    let status = session.status().await?;
    Ok(ToolCallResult::text(status.to_string()))
}

pub async fn authenticate(session: &Session) -> Result<ToolCallResult> {
    let workspace = session.reauthenticate().await?;
    let description = workspace.credential().description();
    info!("Authenticated: {}", description);
    Ok(ToolCallResult::text(format!(
        "Authentication successful. Using {}.",
        description
    )))
}
