//! Credential-source file parsing.
//!
//! Two shapes are recognised: a service identity key
//! (`{"type": "service_account", ...}`) and an installed/web OAuth client
//! (`{"installed": {...}}` or `{"web": {...}}`).

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct ServiceAccountKey {
    #[zeroize(skip)]
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    #[zeroize(skip)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    #[zeroize(skip)]
    pub project_id: Option<String>,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .field("private_key_id", &self.private_key_id)
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// OAuth client identity of an installed (desktop) or web application.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct ClientIdentity {
    #[zeroize(skip)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum CredentialSource {
    ServiceAccount(ServiceAccountKey),
    InstalledApp(ClientIdentity),
}

#[derive(Deserialize)]
struct RawSource {
    #[serde(rename = "type")]
    kind: Option<String>,
    installed: Option<ClientIdentity>,
    web: Option<ClientIdentity>,
}

impl CredentialSource {
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawSource = serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("Unreadable credentials file: {}", e)))?;

        if raw.kind.as_deref() == Some("service_account") {
            let key: ServiceAccountKey = serde_json::from_str(content)
                .map_err(|e| Error::Config(format!("Invalid service account key: {}", e)))?;
            return Ok(Self::ServiceAccount(key));
        }

        match raw.installed.or(raw.web) {
            Some(client) if !client.client_id.is_empty() => Ok(Self::InstalledApp(client)),
            _ => Err(Error::Config(
                "Credentials file is neither a service account key nor an OAuth client (expected \"installed\" or \"web\")"
                    .to_string(),
            )),
        }
    }

    /// `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            debug!("No credentials file at {}", path.display());
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map(Some)
    }
}
