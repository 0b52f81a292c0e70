//! Persisted user token.
//!
//! The token file is plain JSON holding the refresh capability obtained by
//! the interactive flow. It is read once when credentials are loaded and
//! written only when that flow completes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::oauth::OAuthTokens;
use crate::error::{Error, Result};

#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct TokenRecord {
    #[serde(default = "default_token_type")]
    #[zeroize(skip)]
    pub token_type: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// RFC 3339; empty when unknown.
    #[serde(default)]
    #[zeroize(skip)]
    pub expiry: String,
    #[serde(default)]
    #[zeroize(skip)]
    pub scopes: Vec<String>,
    #[serde(default)]
    #[zeroize(skip)]
    pub issued_at: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("token_type", &self.token_type)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .field("scopes", &self.scopes)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

impl TokenRecord {
    pub fn from_tokens(tokens: &OAuthTokens) -> Self {
        Self {
            token_type: tokens.token_type.clone(),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone().unwrap_or_default(),
            expiry: tokens.expiry.to_rfc3339(),
            scopes: tokens.scopes.clone(),
            issued_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Usable without interaction: either refreshable or carrying an access token.
    pub fn is_usable(&self) -> bool {
        !self.refresh_token.is_empty() || !self.access_token.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when no token has been persisted yet.
    pub fn load(&self) -> Result<Option<TokenRecord>> {
        if !self.path.exists() {
            debug!("No stored token at {}", self.path.display());
            return Ok(None);
        }

        let data = fs::read_to_string(&self.path)?;
        let record: TokenRecord = serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("Failed to parse token file {}: {}", self.path.display(), e)))?;

        if !record.is_usable() {
            debug!("Stored token at {} holds no usable secret", self.path.display());
            return Ok(None);
        }
        Ok(Some(record))
    }

    pub fn save(&self, record: &TokenRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(record)?;
        write_private(&self.path, json.as_bytes())?;

        info!("Stored token at {}", self.path.display());
        Ok(())
    }
}

/// Write owner-only from the first byte. An existing file keeps its inode,
/// so its mode is tightened before the secret goes in.
#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TokenRecord {
        TokenRecord {
            token_type: "Bearer".into(),
            access_token: "ya29.a".into(),
            refresh_token: "1//r".into(),
            expiry: "2030-01-01T00:00:00+00:00".into(),
            scopes: vec!["scope".into()],
            issued_at: String::new(),
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested").join("token.json"));
        assert!(store.load().unwrap().is_none());

        store.save(&record()).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.refresh_token, "1//r");
        assert_eq!(loaded.scopes, vec!["scope".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_token_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&record()).unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_tightens_existing_file() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        TokenStore::new(&path).save(&record()).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(fs::read_to_string(&path).unwrap().contains("1//r"));
    }

    #[test]
    fn test_token_without_secrets_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, r#"{"token_type": "Bearer"}"#).unwrap();
        assert!(TokenStore::new(path).load().unwrap().is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let text = format!("{:?}", record());
        assert!(!text.contains("ya29.a"));
        assert!(!text.contains("1//r"));
    }
}
