//! Configuration consumed by the credential cache and service clients.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_CALLBACK_PORT: u16 = 3000;
pub const DEFAULT_TIMEZONE: &str = "Asia/Kolkata";

/// Scopes requested for both the interactive flow and service identities.
pub const DEFAULT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/calendar",
    "https://www.googleapis.com/auth/calendar.events",
    "https://www.googleapis.com/auth/meetings.space.created",
    "https://www.googleapis.com/auth/meetings.space.readonly",
    "https://www.googleapis.com/auth/gmail.modify",
    "https://www.googleapis.com/auth/gmail.compose",
    "https://www.googleapis.com/auth/documents",
    "https://www.googleapis.com/auth/drive.readonly",
];

/// Base URLs for every external surface. Overridable so tests can point the
/// clients at a local mock server.
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    pub meet: String,
    pub calendar: String,
    pub gmail: String,
    pub docs: String,
    pub drive: String,
    pub oauth_authorize: String,
    pub oauth_token: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            meet: "https://meet.googleapis.com/v2".to_string(),
            calendar: "https://www.googleapis.com/calendar/v3".to_string(),
            gmail: "https://gmail.googleapis.com/gmail/v1".to_string(),
            docs: "https://docs.googleapis.com/v1".to_string(),
            drive: "https://www.googleapis.com/drive/v3".to_string(),
            oauth_authorize: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            oauth_token: "https://oauth2.googleapis.com/token".to_string(),
        }
    }
}

impl ApiEndpoints {
    /// Every endpoint rooted at one base URL (wiremock in tests).
    pub fn rooted_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            meet: format!("{}/meet/v2", base),
            calendar: format!("{}/calendar/v3", base),
            gmail: format!("{}/gmail/v1", base),
            docs: format!("{}/docs/v1", base),
            drive: format!("{}/drive/v3", base),
            oauth_authorize: format!("{}/o/oauth2/v2/auth", base),
            oauth_token: format!("{}/token", base),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Credential-source file: service identity key or installed-app client.
    pub credentials_path: PathBuf,
    /// Persisted user token (interactive mode only).
    pub token_path: PathBuf,
    pub callback_port: u16,
    pub default_timezone: String,
    pub scopes: Vec<String>,
    /// Subject to impersonate with a service identity (domain-wide delegation).
    pub impersonate: Option<String>,
    pub open_browser: bool,
    /// `None` keeps the interactive flow waiting until the callback arrives.
    pub auth_timeout: Option<Duration>,
    pub endpoints: ApiEndpoints,
}

impl GoogleConfig {
    /// Defaults rooted at `~/.meetbridge/`.
    pub fn new() -> Result<Self> {
        let base = base_dir()?;
        Ok(Self::with_paths(
            base.join("credentials.json"),
            base.join("token.json"),
        ))
    }

    pub fn with_paths(credentials_path: PathBuf, token_path: PathBuf) -> Self {
        Self {
            credentials_path,
            token_path,
            callback_port: DEFAULT_CALLBACK_PORT,
            default_timezone: DEFAULT_TIMEZONE.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            impersonate: None,
            open_browser: true,
            auth_timeout: None,
            endpoints: ApiEndpoints::default(),
        }
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/oauth2callback", self.callback_port)
    }
}

/// `~/.meetbridge/`
pub fn base_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| Error::Config("Could not determine home directory".into()))?;
    Ok(home.join(".meetbridge"))
}
