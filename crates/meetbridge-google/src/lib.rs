//! Google Workspace access for the meetbridge tool server.
//!
//! Holds the credential cache ([`Session`]), the OAuth plumbing behind it and
//! the three service clients (Meet/Calendar, Gmail, Docs).

pub mod auth;
pub mod config;
pub mod error;
pub mod google;
pub mod session;

pub use auth::{AuthStatus, Credential, CredentialProvider, FileCredentialProvider};
pub use config::{ApiEndpoints, GoogleConfig};
pub use error::{Error, OperationContext, Result};
pub use google::{DocsClient, GmailClient, MeetClient};
pub use session::{Session, Workspace};
