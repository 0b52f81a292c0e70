//! Credential cache.
//!
//! The session owns the process-wide "current workspace": one credential and
//! the service clients lazily bound to it. Clients are created on first use
//! and dropped together with the credential when it is replaced.

use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::auth::{AuthStatus, Credential, CredentialProvider, FileCredentialProvider};
use crate::config::{ApiEndpoints, GoogleConfig};
use crate::error::{Error, Result};
use crate::google::{DocsClient, GmailClient, MeetClient};

/// One credential plus the clients built from it.
pub struct Workspace {
    credential: Credential,
    endpoints: ApiEndpoints,
    meet: OnceCell<MeetClient>,
    gmail: OnceCell<GmailClient>,
    docs: OnceCell<DocsClient>,
}

impl Workspace {
    pub fn new(credential: Credential, endpoints: ApiEndpoints) -> Self {
        Self {
            credential,
            endpoints,
            meet: OnceCell::new(),
            gmail: OnceCell::new(),
            docs: OnceCell::new(),
        }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn meet(&self) -> Result<&MeetClient> {
        self.meet
            .get_or_try_init(|| MeetClient::new(self.credential.clone(), &self.endpoints))
    }

    pub fn gmail(&self) -> Result<&GmailClient> {
        self.gmail
            .get_or_try_init(|| GmailClient::new(self.credential.clone(), &self.endpoints))
    }

    pub fn docs(&self) -> Result<&DocsClient> {
        self.docs
            .get_or_try_init(|| DocsClient::new(self.credential.clone(), &self.endpoints))
    }

    /// Names of the clients created so far.
    pub fn initialized_clients(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.meet.get().is_some() {
            names.push("meet");
        }
        if self.gmail.get().is_some() {
            names.push("gmail");
        }
        if self.docs.get().is_some() {
            names.push("docs");
        }
        names
    }
}

/// Result of the last finished authorization attempt, handed to callers
/// that queued behind it. Failures keep only their message.
type AttemptOutcome = std::result::Result<Arc<Workspace>, String>;

pub struct Session {
    provider: Arc<dyn CredentialProvider>,
    endpoints: ApiEndpoints,
    current: RwLock<Option<Arc<Workspace>>>,
    /// Serializes credential loading so concurrent callers share one attempt.
    auth_gate: Mutex<Option<AttemptOutcome>>,
    /// Authorization attempts finished so far.
    attempts: AtomicU64,
}

impl Session {
    pub fn new(provider: Arc<dyn CredentialProvider>, endpoints: ApiEndpoints) -> Self {
        Self {
            provider,
            endpoints,
            current: RwLock::new(None),
            auth_gate: Mutex::new(None),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: GoogleConfig) -> Result<Self> {
        let endpoints = config.endpoints.clone();
        let provider = FileCredentialProvider::new(config)?;
        Ok(Self::new(Arc::new(provider), endpoints))
    }

    /// Session with a credential already installed.
    pub fn with_credential(
        provider: Arc<dyn CredentialProvider>,
        endpoints: ApiEndpoints,
        credential: Credential,
    ) -> Self {
        let workspace = Arc::new(Workspace::new(credential, endpoints.clone()));
        Self {
            provider,
            endpoints,
            current: RwLock::new(Some(workspace)),
            auth_gate: Mutex::new(None),
            attempts: AtomicU64::new(0),
        }
    }

    pub async fn current(&self) -> Option<Arc<Workspace>> {
        self.current.read().await.clone()
    }

    /// The current workspace, loading credentials without interaction when
    /// none is cached yet.
    pub async fn ensure_authenticated(&self) -> Result<Arc<Workspace>> {
        if let Some(workspace) = self.current().await {
            return Ok(workspace);
        }

        let _gate = self.auth_gate.lock().await;
        // Another caller may have finished loading while we waited.
        if let Some(workspace) = self.current().await {
            return Ok(workspace);
        }

        debug!("No cached credential; loading from provider");
        let credential = self.provider.load().await?.ok_or(Error::NotAuthenticated)?;
        Ok(self.install(credential).await)
    }

    /// Obtain a fresh credential (interactive when required) and replace the
    /// cached workspace with it.
    ///
    /// Callers that arrive while an attempt is running wait for it and get
    /// its outcome instead of starting another flow.
    pub async fn reauthenticate(&self) -> Result<Arc<Workspace>> {
        let seen = self.attempts.load(Ordering::Acquire);
        let mut gate = self.auth_gate.lock().await;
        if self.attempts.load(Ordering::Acquire) != seen {
            if let Some(outcome) = gate.as_ref() {
                debug!("Sharing the outcome of the authorization attempt that just finished");
                return outcome.clone().map_err(Error::Auth);
            }
        }

        let result = match self.provider.authorize().await {
            Ok(credential) => Ok(self.install(credential).await),
            Err(e) => Err(e),
        };
        *gate = Some(match &result {
            Ok(workspace) => Ok(workspace.clone()),
            Err(Error::Auth(message)) => Err(message.clone()),
            Err(e) => Err(e.to_string()),
        });
        self.attempts.fetch_add(1, Ordering::Release);
        result
    }

    async fn install(&self, credential: Credential) -> Arc<Workspace> {
        info!("Installing credential: {}", credential.description());
        let workspace = Arc::new(Workspace::new(credential, self.endpoints.clone()));
        *self.current.write().await = Some(workspace.clone());
        workspace
    }

    /// Describe the credential state, loading passively when nothing is cached.
    pub async fn status(&self) -> Result<AuthStatus> {
        match self.ensure_authenticated().await {
            Ok(workspace) => Ok(AuthStatus::from_credential(workspace.credential())),
            Err(Error::NotAuthenticated) => Ok(AuthStatus::NotAuthenticated {
                source: self.provider.describe_source(),
            }),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingProvider {
        loads: AtomicUsize,
        authorizations: AtomicUsize,
        available: bool,
        authorize_fails: bool,
    }

    impl CountingProvider {
        fn new(available: bool) -> Self {
            Self {
                loads: AtomicUsize::new(0),
                authorizations: AtomicUsize::new(0),
                available,
                authorize_fails: false,
            }
        }

        fn refusing() -> Self {
            Self {
                authorize_fails: true,
                ..Self::new(false)
            }
        }
    }

    #[async_trait]
    impl CredentialProvider for CountingProvider {
        async fn load(&self) -> Result<Option<Credential>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(self
                .available
                .then(|| Credential::from_access_token("loaded")))
        }

        async fn authorize(&self) -> Result<Credential> {
            let n = self.authorizations.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.authorize_fails {
                return Err(Error::Auth("consent denied".into()));
            }
            Ok(Credential::from_access_token(format!("authorized-{}", n)))
        }

        fn describe_source(&self) -> String {
            "test provider".to_string()
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_load() {
        let provider = Arc::new(CountingProvider::new(true));
        let session = Arc::new(Session::new(provider.clone(), ApiEndpoints::default()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let session = session.clone();
            handles.push(tokio::spawn(async move { session.ensure_authenticated().await }));
        }
        let mut workspaces = Vec::new();
        for handle in handles {
            workspaces.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(provider.loads.load(Ordering::SeqCst), 1);
        assert!(workspaces.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn test_concurrent_reauthentication_shares_one_attempt() {
        let provider = Arc::new(CountingProvider::new(false));
        let session = Arc::new(Session::new(provider.clone(), ApiEndpoints::default()));

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.reauthenticate().await }
        });
        let second = tokio::spawn({
            let session = session.clone();
            async move { session.reauthenticate().await }
        });
        let a = first.await.unwrap().unwrap();
        let b = second.await.unwrap().unwrap();

        assert_eq!(provider.authorizations.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));

        // A later call starts a new attempt.
        let c = session.reauthenticate().await.unwrap();
        assert_eq!(provider.authorizations.load(Ordering::SeqCst), 2);
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn test_queued_reauthentication_shares_failure() {
        let provider = Arc::new(CountingProvider::refusing());
        let session = Arc::new(Session::new(provider.clone(), ApiEndpoints::default()));

        let callers: Vec<_> = (0..3)
            .map(|_| {
                let session = session.clone();
                tokio::spawn(async move { session.reauthenticate().await })
            })
            .collect();
        for caller in callers {
            let err = caller.await.unwrap().err().unwrap();
            assert_eq!(err.to_string(), "Authentication failed: consent denied");
        }
        assert_eq!(provider.authorizations.load(Ordering::SeqCst), 1);
        assert!(session.current().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_credentials_is_not_authenticated() {
        let provider = Arc::new(CountingProvider::new(false));
        let session = Session::new(provider, ApiEndpoints::default());
        let err = session.ensure_authenticated().await.err().unwrap();
        assert!(err.is_not_authenticated());

        let status = session.status().await.unwrap();
        assert_eq!(
            status,
            AuthStatus::NotAuthenticated {
                source: "test provider".into()
            }
        );
    }

    #[tokio::test]
    async fn test_reauthenticate_replaces_workspace_and_clients() {
        let provider = Arc::new(CountingProvider::new(true));
        let session = Session::new(provider.clone(), ApiEndpoints::default());

        let first = session.ensure_authenticated().await.unwrap();
        first.meet().unwrap();
        first.gmail().unwrap();
        assert_eq!(first.initialized_clients(), vec!["meet", "gmail"]);

        let second = session.reauthenticate().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.initialized_clients().is_empty());
        assert_eq!(second.credential().access_token().await.unwrap(), "authorized-0");

        let current = session.current().await.unwrap();
        assert!(Arc::ptr_eq(&current, &second));
        assert_eq!(provider.authorizations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clients_are_created_once() {
        let session = Session::with_credential(
            Arc::new(CountingProvider::new(false)),
            ApiEndpoints::default(),
            Credential::from_access_token("t"),
        );
        let workspace = session.ensure_authenticated().await.unwrap();
        let a = workspace.docs().unwrap() as *const DocsClient;
        let b = workspace.docs().unwrap() as *const DocsClient;
        assert_eq!(a, b);
    }
}
