//! Identity provider seam.
//!
//! The gateway owns no credentials. Every account, password and session token
//! lives in an external identity provider reached through [`IdentityProvider`].
//! Two implementations ship with the crate:
//!
//! - [`GoTrueProvider`]: HTTP client for a GoTrue-compatible auth API
//!   (Supabase Auth).
//! - [`MemoryProvider`]: in-process accounts for local development and tests.
//!
//! The handle is built once at startup and injected into the router, so a
//! fake can replace the real provider without touching the handlers.

mod gotrue;
mod memory;

pub use self::gotrue::GoTrueProvider;
pub use self::memory::MemoryProvider;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Shared provider handle carried by the router.
pub type SharedProvider = Arc<dyn IdentityProvider>;

/// Result of a successful account creation or credential check.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountSession {
    /// Provider-issued account identifier, when the provider returns one.
    pub account_id: Option<String>,
    /// Session token; `None` when the provider requires a confirmation step.
    pub token: Option<String>,
}

/// Identity resolved from a bearer token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider understood the request and refused it (duplicate account,
    /// bad credentials, expired token).
    #[error("{message}")]
    Rejected { status: u16, message: String },
    /// Transport failure, provider-side fault or an unreadable response.
    #[error("{0}")]
    Unavailable(String),
}

impl ProviderError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }
}

/// The three opaque operations the gateway delegates.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account; `name` is stored as provider-side user metadata.
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<AccountSession, ProviderError>;

    /// Exchange an email and password for a session.
    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountSession, ProviderError>;

    /// Resolve the account behind a session token.
    async fn resolve_identity(&self, token: &str) -> Result<Identity, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_displays_provider_message() {
        let err = ProviderError::rejected(422, "User already registered");
        assert_eq!(err.to_string(), "User already registered");
        assert!(matches!(err, ProviderError::Rejected { status: 422, .. }));
    }

    #[test]
    fn unavailable_displays_raw_error() {
        let err = ProviderError::Unavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "connection refused");
    }
}
