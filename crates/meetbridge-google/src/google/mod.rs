//! Google Workspace service clients.
//!
//! Each client wraps an authenticated [`client::GoogleClient`] bound to one
//! [`Credential`](crate::auth::Credential) and turns raw API responses into
//! the records in [`types`].

pub mod calendar;
pub mod client;
pub mod common;
pub mod docs;
pub mod gmail;
pub mod meet;
pub mod types;

pub use calendar::{EventWindow, NewEvent};
pub use docs::DocsClient;
pub use gmail::{GmailClient, OutgoingMessage};
pub use meet::MeetClient;

/// Implement the shared constructor for a service client wrapping a
/// `GoogleClient` plus the API base URLs it talks to.
macro_rules! google_api_wrapper {
    ($name:ident) => {
        impl $name {
            /// Bind a new client to `credential`.
            pub fn new(
                credential: crate::auth::Credential,
                endpoints: &crate::config::ApiEndpoints,
            ) -> crate::error::Result<Self> {
                let client = crate::google::client::GoogleClient::new(credential)?;
                Ok(Self {
                    client,
                    endpoints: endpoints.clone(),
                })
            }
        }
    };
}

pub(crate) use google_api_wrapper;
