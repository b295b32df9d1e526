use super::{ApiError, ErrorEnvelope, SessionEnvelope, required};
use crate::provider::{ProviderError, SharedProvider};
use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Default)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

// Never derive Debug: the payload carries a password.
impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .field("name", &self.name)
            .finish()
    }
}

#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses (
        (status = 200, description = "Account created; token is null until the email is confirmed", body = SessionEnvelope),
        (status = 400, description = "Missing email or password, or the provider refused the account", body = ErrorEnvelope),
        (status = 500, description = "Provider unreachable or returned an unexpected response", body = ErrorEnvelope),
    ),
    tag = "auth"
)]
#[instrument(skip(provider, payload))]
pub async fn register(
    provider: Extension<SharedProvider>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<SessionEnvelope>, ApiError> {
    let request = payload.map(|Json(request)| request).unwrap_or_default();

    let (Some(email), Some(password)) = (required(request.email), required(request.password))
    else {
        return Err(ApiError::missing_credentials());
    };

    match provider
        .create_account(&email, &password, request.name.as_deref())
        .await
    {
        Ok(session) => {
            debug!(
                pending_confirmation = session.token.is_none(),
                "account created"
            );
            Ok(Json(SessionEnvelope::new(session.account_id, session.token)))
        }
        Err(ProviderError::Rejected { message, .. }) => {
            debug!("provider refused registration: {message}");
            Err(ApiError::Provider(message))
        }
        Err(ProviderError::Unavailable(error)) => Err(ApiError::Unexpected {
            message: "Registration failed",
            error,
        }),
    }
}
