//! Credential creation and access-token upkeep.
//!
//! A [`Credential`] is the single authorization handle every service client
//! is bound to. It comes from one of two sources: a service identity key, or
//! an installed-app client plus a persisted refresh token obtained through
//! the interactive loopback flow.

pub mod callback;
pub mod oauth;
pub mod source;
pub mod store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use zeroize::Zeroize;

use self::callback::CallbackListener;
use self::oauth::{generate_code_challenge, generate_code_verifier, generate_state, GoogleOAuth, OAuthTokens};
use self::source::{ClientIdentity, CredentialSource, ServiceAccountKey};
use self::store::{TokenRecord, TokenStore};
use crate::config::GoogleConfig;
use crate::error::{Error, Result};

/// Refresh when the cached access token expires within this margin.
const EXPIRY_MARGIN_SECS: i64 = 60;

// ── Credential ──────────────────────────────────────────────────────────────

enum CredentialKind {
    ServiceAccount {
        key: ServiceAccountKey,
        subject: Option<String>,
    },
    User {
        client: ClientIdentity,
        refresh_token: String,
    },
    /// Pre-issued bearer token with no refresh capability.
    Static,
}

struct CachedToken {
    token: String,
    expiry: Option<DateTime<Utc>>,
}

impl Drop for CachedToken {
    fn drop(&mut self) {
        self.token.zeroize();
    }
}

struct CredentialInner {
    kind: CredentialKind,
    oauth: Option<GoogleOAuth>,
    scopes: Vec<String>,
    cached: Mutex<Option<CachedToken>>,
}

/// Cheaply cloneable authorization handle.
///
/// The handle itself is never swapped in place; re-authentication builds a
/// new one. Only the short-lived access token behind it is renewed.
#[derive(Clone)]
pub struct Credential {
    inner: Arc<CredentialInner>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.description())
            .finish()
    }
}

impl Credential {
    pub fn service_account(
        key: ServiceAccountKey,
        subject: Option<String>,
        oauth: GoogleOAuth,
        scopes: Vec<String>,
    ) -> Self {
        Self::build(CredentialKind::ServiceAccount { key, subject }, Some(oauth), scopes, None)
    }

    pub fn user(client: ClientIdentity, record: &TokenRecord, oauth: GoogleOAuth) -> Self {
        let seeded = (!record.access_token.is_empty()).then(|| CachedToken {
            token: record.access_token.clone(),
            // Unknown expiry means "refresh on first use".
            expiry: Some(
                DateTime::parse_from_rfc3339(&record.expiry)
                    .map(|d| d.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            ),
        });
        Self::build(
            CredentialKind::User {
                client,
                refresh_token: record.refresh_token.clone(),
            },
            Some(oauth),
            record.scopes.clone(),
            seeded,
        )
    }

    /// Credential around an already-issued bearer token that never expires
    /// from our point of view.
    pub fn from_access_token(token: impl Into<String>) -> Self {
        Self::build(
            CredentialKind::Static,
            None,
            Vec::new(),
            Some(CachedToken {
                token: token.into(),
                expiry: None,
            }),
        )
    }

    fn build(
        kind: CredentialKind,
        oauth: Option<GoogleOAuth>,
        scopes: Vec<String>,
        cached: Option<CachedToken>,
    ) -> Self {
        Self {
            inner: Arc::new(CredentialInner {
                kind,
                oauth,
                scopes,
                cached: Mutex::new(cached),
            }),
        }
    }

    pub fn service_account_email(&self) -> Option<&str> {
        match &self.inner.kind {
            CredentialKind::ServiceAccount { key, .. } => Some(&key.client_email),
            _ => None,
        }
    }

    pub fn description(&self) -> String {
        match &self.inner.kind {
            CredentialKind::ServiceAccount { key, subject } => match subject {
                Some(sub) => format!("service account {} (acting as {})", key.client_email, sub),
                None => format!("service account {}", key.client_email),
            },
            CredentialKind::User { .. } => "stored user token".to_string(),
            CredentialKind::Static => "pre-issued access token".to_string(),
        }
    }

    /// A valid access token, renewed when missing or about to expire.
    ///
    /// The cache lock is held across the renewal so concurrent callers share
    /// one token-endpoint round trip.
    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.inner.cached.lock().await;

        if let Some(current) = cached.as_ref() {
            let fresh = match current.expiry {
                None => true,
                Some(expiry) => !is_token_expiring(expiry, EXPIRY_MARGIN_SECS),
            };
            if fresh {
                return Ok(current.token.clone());
            }
        }

        let tokens = self.renew().await?;
        let token = tokens.access_token.clone();
        *cached = Some(CachedToken {
            token: tokens.access_token,
            expiry: Some(tokens.expiry),
        });
        Ok(token)
    }

    async fn renew(&self) -> Result<OAuthTokens> {
        let oauth = self.inner.oauth.as_ref();
        match (&self.inner.kind, oauth) {
            (CredentialKind::ServiceAccount { key, subject }, Some(oauth)) => {
                oauth
                    .service_account_token(key, &self.inner.scopes, subject.as_deref())
                    .await
            }
            (CredentialKind::User { client, refresh_token }, Some(oauth)) => {
                if refresh_token.is_empty() {
                    return Err(Error::Auth(
                        "Stored access token has expired and no refresh token is available; call authenticate again"
                            .to_string(),
                    ));
                }
                oauth.refresh(client, refresh_token).await
            }
            _ => Err(Error::Auth("Access token cannot be renewed".to_string())),
        }
    }
}

/// Whether `expiry` falls within `margin_secs` of now.
fn is_token_expiring(expiry: DateTime<Utc>, margin_secs: i64) -> bool {
    expiry.signed_duration_since(Utc::now()).num_seconds() < margin_secs
}

// ── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    ServiceAccount { email: String },
    UserToken,
    Other { description: String },
    NotAuthenticated { source: String },
}

impl AuthStatus {
    pub fn from_credential(credential: &Credential) -> Self {
        match credential.service_account_email() {
            Some(email) => Self::ServiceAccount {
                email: email.to_string(),
            },
            None if matches!(credential.inner.kind, CredentialKind::User { .. }) => Self::UserToken,
            None => Self::Other {
                description: credential.description(),
            },
        }
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServiceAccount { email } => {
                write!(f, "Authenticated with service account {}.", email)
            }
            Self::UserToken => write!(f, "Authenticated with a stored Google user token."),
            Self::Other { description } => write!(f, "Authenticated with {}.", description),
            Self::NotAuthenticated { source } => write!(
                f,
                "Not authenticated. {} Call the authenticate tool to connect a Google account.",
                source
            ),
        }
    }
}

// ── Providers ───────────────────────────────────────────────────────────────

/// Where credentials come from. The session only talks to this seam, so
/// tests can substitute their own source.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Credential available without operator interaction, if any.
    async fn load(&self) -> Result<Option<Credential>>;

    /// Fresh credential, running the interactive flow when needed.
    async fn authorize(&self) -> Result<Credential>;

    /// Where credentials were looked for, for status messages.
    fn describe_source(&self) -> String;
}

/// File-backed provider: credential-source file + persisted token file.
pub struct FileCredentialProvider {
    config: GoogleConfig,
    oauth: GoogleOAuth,
    store: TokenStore,
}

impl FileCredentialProvider {
    pub fn new(config: GoogleConfig) -> Result<Self> {
        let oauth = GoogleOAuth::new(
            config.endpoints.oauth_authorize.clone(),
            config.endpoints.oauth_token.clone(),
        )?;
        let store = TokenStore::new(config.token_path.clone());
        Ok(Self { config, oauth, store })
    }

    fn service_credential(&self, key: ServiceAccountKey) -> Credential {
        info!("Using service account {}", key.client_email);
        Credential::service_account(
            key,
            self.config.impersonate.clone(),
            self.oauth.clone(),
            self.config.scopes.clone(),
        )
    }

    async fn interactive(&self, client: ClientIdentity) -> Result<Credential> {
        let verifier = generate_code_verifier();
        let challenge = generate_code_challenge(&verifier);
        let state = generate_state();
        let redirect_uri = self.config.redirect_uri();

        // Bind before showing the URL so the redirect cannot race the listener.
        let listener = CallbackListener::bind(self.config.callback_port).await?;
        let auth_url = self
            .oauth
            .authorize_url(&client, &self.config.scopes, &state, &challenge, &redirect_uri);

        info!("Waiting for Google authorization on {}", redirect_uri);
        eprintln!("Authorize meetbridge by visiting this URL:\n\n{}\n", auth_url);
        if self.config.open_browser {
            if let Err(e) = open::that(&auth_url) {
                warn!("Failed to open browser automatically: {}", e);
            }
        }

        let code = match self.config.auth_timeout {
            Some(limit) => tokio::time::timeout(limit, listener.wait_for_code(&state))
                .await
                .map_err(|_| {
                    Error::Auth(format!("Authorization timed out after {} seconds", limit.as_secs()))
                })??,
            None => listener.wait_for_code(&state).await?,
        };

        let tokens = self
            .oauth
            .exchange_code(&client, &code, &verifier, &redirect_uri)
            .await?;
        if tokens.refresh_token.is_none() {
            warn!("Authorization returned no refresh token; the session will need re-authorization once it expires");
        }

        let record = TokenRecord::from_tokens(&tokens);
        self.store.save(&record)?;
        info!("Interactive authorization completed");

        Ok(Credential::user(client, &record, self.oauth.clone()))
    }
}

#[async_trait]
impl CredentialProvider for FileCredentialProvider {
    async fn load(&self) -> Result<Option<Credential>> {
        match CredentialSource::load(&self.config.credentials_path)? {
            None => Ok(None),
            Some(CredentialSource::ServiceAccount(key)) => Ok(Some(self.service_credential(key))),
            Some(CredentialSource::InstalledApp(client)) => {
                let Some(record) = self.store.load()? else {
                    return Ok(None);
                };
                info!("Loaded stored token from {}", self.store.path().display());
                Ok(Some(Credential::user(client, &record, self.oauth.clone())))
            }
        }
    }

    async fn authorize(&self) -> Result<Credential> {
        let source = CredentialSource::load(&self.config.credentials_path)?.ok_or_else(|| {
            Error::Config(format!(
                "No credentials file found at {}",
                self.config.credentials_path.display()
            ))
        })?;

        match source {
            CredentialSource::ServiceAccount(key) => Ok(self.service_credential(key)),
            CredentialSource::InstalledApp(client) => {
                if let Some(record) = self.store.load()? {
                    let credential = Credential::user(client.clone(), &record, self.oauth.clone());
                    match credential.access_token().await {
                        Ok(_) => return Ok(credential),
                        Err(e) => warn!("Stored token is no longer valid ({}); starting authorization", e),
                    }
                }
                self.interactive(client).await
            }
        }
    }

    fn describe_source(&self) -> String {
        format!(
            "Looked for credentials at {} and a stored token at {}.",
            self.config.credentials_path.display(),
            self.store.path().display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiEndpoints;
    use std::path::Path;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_in(dir: &Path, token_endpoint_base: &str) -> GoogleConfig {
        let mut config = GoogleConfig::with_paths(dir.join("credentials.json"), dir.join("token.json"));
        config.endpoints = ApiEndpoints::rooted_at(token_endpoint_base);
        config.open_browser = false;
        config
    }

    fn write_installed(dir: &Path) {
        std::fs::write(
            dir.join("credentials.json"),
            r#"{"installed": {"client_id": "cid", "client_secret": "cs"}}"#,
        )
        .unwrap();
    }

    #[test]
    fn test_is_token_expiring() {
        assert!(is_token_expiring(Utc::now() + chrono::Duration::seconds(30), 60));
        assert!(!is_token_expiring(Utc::now() + chrono::Duration::seconds(3600), 60));
        assert!(is_token_expiring(Utc::now() - chrono::Duration::seconds(1), 0));
    }

    #[tokio::test]
    async fn test_static_credential_returns_token() {
        let credential = Credential::from_access_token("tok");
        assert_eq!(credential.access_token().await.unwrap(), "tok");
        assert!(credential.service_account_email().is_none());
    }

    #[tokio::test]
    async fn test_load_without_credentials_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileCredentialProvider::new(config_in(dir.path(), "http://127.0.0.1:1")).unwrap();
        assert!(provider.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_installed_app_without_token_is_none() {
        let dir = tempfile::tempdir().unwrap();
        write_installed(dir.path());
        let provider = FileCredentialProvider::new(config_in(dir.path(), "http://127.0.0.1:1")).unwrap();
        assert!(provider.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_authorize_without_credentials_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileCredentialProvider::new(config_in(dir.path(), "http://127.0.0.1:1")).unwrap();
        let err = provider.authorize().await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_stored_token_refreshes_when_expired() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "renewed",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        write_installed(dir.path());
        let store = TokenStore::new(dir.path().join("token.json"));
        store
            .save(&TokenRecord {
                token_type: "Bearer".into(),
                access_token: "stale".into(),
                refresh_token: "rt".into(),
                expiry: "2000-01-01T00:00:00+00:00".into(),
                scopes: vec![],
                issued_at: String::new(),
            })
            .unwrap();

        let provider = FileCredentialProvider::new(config_in(dir.path(), &server.uri())).unwrap();
        let credential = provider.load().await.unwrap().unwrap();
        assert_eq!(credential.access_token().await.unwrap(), "renewed");
        // Second call is served from the cache.
        assert_eq!(credential.access_token().await.unwrap(), "renewed");
        assert_eq!(AuthStatus::from_credential(&credential), AuthStatus::UserToken);
    }

    #[test]
    fn test_status_text() {
        let status = AuthStatus::ServiceAccount {
            email: "bot@x.iam.gserviceaccount.com".into(),
        };
        assert!(status.to_string().contains("bot@x.iam.gserviceaccount.com"));

        let missing = AuthStatus::NotAuthenticated {
            source: "Looked nowhere.".into(),
        };
        assert!(missing.to_string().contains("authenticate"));
    }
}
