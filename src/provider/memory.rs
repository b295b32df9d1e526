//! In-process identity provider.
//!
//! Accounts and tokens live in a process-local map and vanish on restart.
//! Messages mirror the ones GoTrue returns so callers see the same text in
//! development as in production.

use super::{AccountSession, Identity, IdentityProvider, ProviderError};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use ulid::Ulid;

pub const DUPLICATE_ACCOUNT: &str = "User already registered";
pub const INVALID_CREDENTIALS: &str = "Invalid login credentials";
pub const EMAIL_NOT_CONFIRMED: &str = "Email not confirmed";
pub const INVALID_TOKEN: &str = "invalid JWT: unable to parse or verify signature";

/// Live sessions kept per account; the oldest is revoked past this.
pub const MAX_SESSIONS_PER_ACCOUNT: usize = 5;

#[derive(Debug)]
struct Account {
    id: String,
    email: String,
    name: Option<String>,
    password: SecretString,
    confirmed: bool,
    /// Issued tokens, oldest first.
    tokens: VecDeque<String>,
}

#[derive(Debug, Default)]
struct Directory {
    /// Accounts keyed by lower-cased email.
    accounts: HashMap<String, Account>,
    /// Session token to account email.
    sessions: HashMap<String, String>,
}

#[derive(Debug, Default)]
pub struct MemoryProvider {
    directory: RwLock<Directory>,
    require_confirmation: bool,
}

impl MemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signups return no session and logins fail until confirmed, like a
    /// GoTrue project with email confirmation enabled.
    #[must_use]
    pub fn with_confirmation_required(mut self) -> Self {
        self.require_confirmation = true;
        self
    }

    fn issue_token(directory: &mut Directory, key: &str) -> Result<String, ProviderError> {
        let account = directory
            .accounts
            .get_mut(key)
            .ok_or_else(|| ProviderError::Unavailable(format!("no account for {key}")))?;

        let token = Ulid::new().to_string();
        account.tokens.push_back(token.clone());

        let mut revoked = Vec::new();
        while account.tokens.len() > MAX_SESSIONS_PER_ACCOUNT {
            if let Some(old) = account.tokens.pop_front() {
                revoked.push(old);
            }
        }

        for old in revoked {
            directory.sessions.remove(&old);
        }
        directory.sessions.insert(token.clone(), key.to_string());

        Ok(token)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl IdentityProvider for MemoryProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<AccountSession, ProviderError> {
        let key = normalize_email(email);
        let mut directory = self.directory.write().await;

        if directory.accounts.contains_key(&key) {
            return Err(ProviderError::rejected(422, DUPLICATE_ACCOUNT));
        }

        let id = Ulid::new().to_string();
        directory.accounts.insert(
            key.clone(),
            Account {
                id: id.clone(),
                email: email.trim().to_string(),
                name: name.map(str::to_string),
                password: SecretString::from(password.to_string()),
                confirmed: !self.require_confirmation,
                tokens: VecDeque::new(),
            },
        );

        let token = if self.require_confirmation {
            None
        } else {
            Some(Self::issue_token(&mut directory, &key)?)
        };

        Ok(AccountSession {
            account_id: Some(id),
            token,
        })
    }

    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountSession, ProviderError> {
        let key = normalize_email(email);
        let mut directory = self.directory.write().await;

        let (id, confirmed) = match directory.accounts.get(&key) {
            Some(account) if account.password.expose_secret() == password => {
                (account.id.clone(), account.confirmed)
            }
            _ => return Err(ProviderError::rejected(400, INVALID_CREDENTIALS)),
        };

        if !confirmed {
            return Err(ProviderError::rejected(400, EMAIL_NOT_CONFIRMED));
        }

        let token = Self::issue_token(&mut directory, &key)?;

        Ok(AccountSession {
            account_id: Some(id),
            token: Some(token),
        })
    }

    async fn resolve_identity(&self, token: &str) -> Result<Identity, ProviderError> {
        let directory = self.directory.read().await;

        directory
            .sessions
            .get(token)
            .and_then(|email| directory.accounts.get(email))
            .map(|account| Identity {
                id: account.id.clone(),
                email: account.email.clone(),
                name: account.name.clone(),
            })
            .ok_or_else(|| ProviderError::rejected(403, INVALID_TOKEN))
    }
}
