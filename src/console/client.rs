//! HTTP client for the gateway envelope API.
//!
//! Every gateway response is decoded as an envelope regardless of status code:
//! `success: true` bodies become [`Reply::Ok`], `success: false` bodies become
//! [`Reply::Failed`]. Only transport problems and non-envelope bodies surface
//! as [`ConsoleError`].

use crate::api::handlers::{ErrorEnvelope, SessionEnvelope, profile::ProfileEnvelope};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum number of error body characters surfaced to the banner.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Request failed ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("Response error: {0}")]
    Parse(String),
}

/// Decoded gateway envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply<T> {
    Ok(T),
    Failed { status: u16, message: String },
}

/// Session returned by register and login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user_id: Option<String>,
    pub token: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

impl From<SessionEnvelope> for Session {
    fn from(envelope: SessionEnvelope) -> Self {
        Self {
            user_id: envelope.user_id,
            token: envelope.token,
        }
    }
}

impl From<ProfileEnvelope> for Profile {
    fn from(envelope: ProfileEnvelope) -> Self {
        Self {
            id: envelope.user.id,
            email: envelope.user.email,
            name: envelope.user.name,
        }
    }
}

/// Gateway operations the console depends on.
#[async_trait]
pub trait GatewayApi: Send + Sync {
    async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<Reply<Session>, ConsoleError>;

    async fn login(&self, email: &str, password: &str) -> Result<Reply<Session>, ConsoleError>;

    async fn profile(&self, token: &str) -> Result<Reply<Profile>, ConsoleError>;
}

#[async_trait]
impl<T: GatewayApi + ?Sized> GatewayApi for std::sync::Arc<T> {
    async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<Reply<Session>, ConsoleError> {
        (**self).register(email, password, name).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<Reply<Session>, ConsoleError> {
        (**self).login(email, password).await
    }

    async fn profile(&self, token: &str) -> Result<Reply<Profile>, ConsoleError> {
        (**self).profile(token).await
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Clone, Debug)]
pub struct GatewayClient {
    client: Client,
    base_url: Url,
}

impl GatewayClient {
    /// Build a client for the gateway at `base_url`, which may include a
    /// mount prefix such as `/.netlify/functions/auth`.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
            .with_context(|| format!("Invalid gateway URL: {base_url}"))?;

        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build gateway HTTP client")?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url, ConsoleError> {
        self.base_url
            .join(path)
            .map_err(|err| ConsoleError::Network(format!("Invalid gateway path {path}: {err}")))
    }

    async fn send<T>(&self, request: RequestBuilder) -> Result<Reply<T>, ConsoleError>
    where
        T: DeserializeOwned,
    {
        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                ConsoleError::Timeout(err.to_string())
            } else {
                ConsoleError::Network(err.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| ConsoleError::Network(err.to_string()))?;

        decode_envelope(status, &body)
    }
}

/// Decode an envelope body; `T` is the success shape.
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    status: u16,
    body: &str,
) -> Result<Reply<T>, ConsoleError> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Err(ConsoleError::Http {
            status,
            message: truncate(body),
        });
    };

    match value.get("success").and_then(Value::as_bool) {
        Some(true) => serde_json::from_value(value)
            .map(Reply::Ok)
            .map_err(|err| ConsoleError::Parse(err.to_string())),
        Some(false) => serde_json::from_value::<ErrorEnvelope>(value)
            .map(|envelope| Reply::Failed {
                status,
                message: envelope.message,
            })
            .map_err(|err| ConsoleError::Parse(err.to_string())),
        None => Err(ConsoleError::Parse(
            "response is missing the success flag".to_string(),
        )),
    }
}

fn truncate(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() > MAX_ERROR_CHARS {
        let mut message: String = trimmed.chars().take(MAX_ERROR_CHARS).collect();
        message.push_str("...");
        message
    } else {
        trimmed.to_string()
    }
}

fn map_reply<E, T: From<E>>(reply: Reply<E>) -> Reply<T> {
    match reply {
        Reply::Ok(envelope) => Reply::Ok(envelope.into()),
        Reply::Failed { status, message } => Reply::Failed { status, message },
    }
}

#[async_trait]
impl GatewayApi for GatewayClient {
    async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<Reply<Session>, ConsoleError> {
        let request = self.client.post(self.url("register")?).json(&Credentials {
            email,
            password,
            name,
        });
        self.send::<SessionEnvelope>(request).await.map(map_reply)
    }

    async fn login(&self, email: &str, password: &str) -> Result<Reply<Session>, ConsoleError> {
        let request = self.client.post(self.url("login")?).json(&Credentials {
            email,
            password,
            name: None,
        });
        self.send::<SessionEnvelope>(request).await.map(map_reply)
    }

    async fn profile(&self, token: &str) -> Result<Reply<Profile>, ConsoleError> {
        let request = self.client.get(self.url("profile")?).bearer_auth(token);
        self.send::<ProfileEnvelope>(request).await.map(map_reply)
    }
}
