//! Tool-call dispatch: name lookup, authentication gate, validation,
//! handler invocation and envelope construction.

use std::sync::Arc;

use meetbridge_google::Session;
use meetbridge_protocol::ToolCallResult;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::args::{ArgDefaults, ToolRequest};
use crate::handlers;
use crate::tools::ToolKind;

pub const NOT_AUTHENTICATED_MESSAGE: &str =
    "Not authenticated. Please call the `authenticate` tool first to connect your Google account.";

/// Failures that escape a tool call and are left to the server's backstop.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Google(#[from] meetbridge_google::Error),
}

pub struct Dispatcher {
    session: Arc<Session>,
    defaults: ArgDefaults,
}

impl Dispatcher {
    pub fn new(session: Arc<Session>, defaults: ArgDefaults) -> Self {
        Self { session, defaults }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Run one tool call. Unknown tools, missing credentials and invalid
    /// arguments come back as error envelopes; upstream failures are
    /// returned as `Err`.
    pub async fn call(&self, name: &str, arguments: &Value) -> Result<ToolCallResult, DispatchError> {
        let Some(kind) = ToolKind::from_name(name) else {
            warn!("Unknown tool requested: {}", name);
            return Ok(ToolCallResult::error(format!("Unknown tool: {}", name)));
        };

        info!("Tool call: {}", name);

        if kind.requires_auth() {
            match self.session.ensure_authenticated().await {
                Ok(_) => {}
                Err(e) if e.is_not_authenticated() => {
                    debug!("{} rejected: not authenticated", name);
                    return Ok(ToolCallResult::error(NOT_AUTHENTICATED_MESSAGE));
                }
                Err(e) => return Err(e.into()),
            }
        }

        let request = match ToolRequest::decode(kind, arguments, &self.defaults) {
            Ok(request) => request,
            Err(e) => {
                debug!("{} rejected: {}", name, e);
                return Ok(ToolCallResult::error(e.to_string()));
            }
        };

        match handlers::run(request, &self.session).await {
            Ok(result) => Ok(result),
            Err(e) if e.is_not_authenticated() => Ok(ToolCallResult::error(NOT_AUTHENTICATED_MESSAGE)),
            Err(e) => {
                warn!("{} failed: {}", name, e);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use meetbridge_google::{ApiEndpoints, Credential, CredentialProvider};
    use serde_json::json;

    struct NoCredentials;

    #[async_trait]
    impl CredentialProvider for NoCredentials {
        async fn load(&self) -> meetbridge_google::Result<Option<Credential>> {
            Ok(None)
        }

        async fn authorize(&self) -> meetbridge_google::Result<Credential> {
            Err(meetbridge_google::Error::Auth("no browser in tests".into()))
        }

        fn describe_source(&self) -> String {
            "No credentials in tests.".into()
        }
    }

    fn unauthenticated() -> Dispatcher {
        let session = Session::new(Arc::new(NoCredentials), ApiEndpoints::rooted_at("http://127.0.0.1:9"));
        Dispatcher::new(Arc::new(session), ArgDefaults::default())
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error_envelope() {
        let result = unauthenticated().call("launch_rocket", &json!({})).await.unwrap();
        assert!(result.is_error);
        assert_eq!(result.joined_text(), "Unknown tool: launch_rocket");
    }

    #[tokio::test]
    async fn test_not_authenticated_short_circuits_validation() {
        // Arguments are invalid too, but authentication is checked first.
        let result = unauthenticated()
            .call("send_email", &json!({"to": "nope"}))
            .await
            .unwrap();
        assert!(result.is_error);
        assert_eq!(result.joined_text(), NOT_AUTHENTICATED_MESSAGE);
    }

    #[tokio::test]
    async fn test_auth_status_works_without_credentials() {
        let result = unauthenticated().call("auth_status", &Value::Null).await.unwrap();
        assert!(!result.is_error);
        assert!(result.joined_text().starts_with("Not authenticated. No credentials in tests."));
    }

    #[tokio::test]
    async fn test_authenticate_failure_escapes_to_backstop() {
        let err = unauthenticated().call("authenticate", &json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "Authentication failed: no browser in tests");
    }

    #[tokio::test]
    async fn test_validation_error_envelope() {
        let session = Session::with_credential(
            Arc::new(NoCredentials),
            ApiEndpoints::rooted_at("http://127.0.0.1:9"),
            Credential::from_access_token("t"),
        );
        let dispatcher = Dispatcher::new(Arc::new(session), ArgDefaults::default());

        let result = dispatcher.call("list_emails", &json!({"limit": 500})).await.unwrap();
        assert!(result.is_error);
        assert_eq!(result.joined_text(), "Invalid arguments: limit: must be at most 50");
    }
}
