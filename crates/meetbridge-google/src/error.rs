//! Error taxonomy for the Google layer.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No credential could be loaded without operator interaction.
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Google API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited. Please try again later.")]
    RateLimited,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A service-client operation failed; `detail` is the upstream cause.
    #[error("Failed to {operation}: {detail}")]
    Failed {
        operation: &'static str,
        detail: String,
    },
}

impl Error {
    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, Self::NotAuthenticated)
    }
}

/// Attach the failed operation's name to an error, the way every service
/// client reports upstream failures. `NotAuthenticated` passes through
/// untouched so the dispatcher can still recognise it.
pub trait OperationContext<T> {
    fn operation(self, operation: &'static str) -> Result<T>;
}

impl<T> OperationContext<T> for Result<T> {
    fn operation(self, operation: &'static str) -> Result<T> {
        self.map_err(|e| match e {
            Error::NotAuthenticated => Error::NotAuthenticated,
            other => Error::Failed {
                operation,
                detail: other.to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_prefix() {
        let res: Result<()> = Err(Error::Api {
            status: 404,
            message: "Requested entity was not found.".into(),
        });
        let err = res.operation("get conference").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to get conference: Google API error 404: Requested entity was not found."
        );
    }

    #[test]
    fn test_not_authenticated_is_preserved() {
        let res: Result<()> = Err(Error::NotAuthenticated);
        let err = res.operation("list emails").unwrap_err();
        assert!(err.is_not_authenticated());
    }
}
