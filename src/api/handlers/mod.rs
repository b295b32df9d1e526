//! Gateway route handlers and the response envelope they share.
//!
//! Every response is a JSON object with a boolean `success`. Failures carry a
//! `message`; only unexpected failures add the raw `error` text. Handlers
//! return `Result<Json<..>, ApiError>` so each operation maps its outcome in
//! exactly one place.

pub mod health;
pub mod login;
pub mod profile;
pub mod register;
pub mod root;


use axum::{
    Json,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

pub const MISSING_CREDENTIALS: &str = "Missing email or password";
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const INVALID_AUTHORIZATION: &str = "Missing or invalid Authorization header";
pub const INVALID_TOKEN: &str = "Invalid token";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller input is missing or malformed.
    #[error("{message}")]
    Validation {
        status: StatusCode,
        message: &'static str,
    },
    /// Credentials or token refused; the message never reveals why.
    #[error("{0}")]
    Auth(&'static str),
    /// Provider refusal whose message is safe to pass through.
    #[error("{0}")]
    Provider(String),
    /// Anything else; only a generic message plus the raw error text.
    #[error("{message}: {error}")]
    Unexpected { message: &'static str, error: String },
}

impl ApiError {
    #[must_use]
    pub const fn missing_credentials() -> Self {
        Self::Validation {
            status: StatusCode::BAD_REQUEST,
            message: MISSING_CREDENTIALS,
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation { status, .. } => *status,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Provider(_) => StatusCode::BAD_REQUEST,
            Self::Unexpected { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_envelope(self) -> ErrorEnvelope {
        match self {
            Self::Validation { message, .. } | Self::Auth(message) => {
                ErrorEnvelope::new(message.to_string(), None)
            }
            Self::Provider(message) => ErrorEnvelope::new(message, None),
            Self::Unexpected { message, error } => {
                ErrorEnvelope::new(message.to_string(), Some(error))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{self}");
        }

        (status, Json(self.into_envelope())).into_response()
    }
}

/// Failure envelope shared by every route.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorEnvelope {
    fn new(message: String, error: Option<String>) -> Self {
        Self {
            success: false,
            message,
            error,
        }
    }
}

/// Success envelope for register and login.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct SessionEnvelope {
    pub success: bool,
    pub user_id: Option<String>,
    /// `null` when the provider requires confirmation before issuing a session.
    pub token: Option<String>,
}

impl SessionEnvelope {
    fn new(user_id: Option<String>, token: Option<String>) -> Self {
        Self {
            success: true,
            user_id,
            token,
        }
    }
}

/// Keep only present, non-empty values.
fn required(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, rest) = value.split_once(' ')?;
    if scheme != "Bearer" {
        return None;
    }

    rest.split(' ').next().filter(|token| !token.is_empty())
}
