use super::{ApiError, ErrorEnvelope, INVALID_CREDENTIALS, SessionEnvelope, required};
use crate::provider::{ProviderError, SharedProvider};
use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses (
        (status = 200, description = "Credentials accepted", body = SessionEnvelope),
        (status = 400, description = "Missing email or password", body = ErrorEnvelope),
        (status = 401, description = "Invalid email or password", body = ErrorEnvelope),
        (status = 500, description = "Provider unreachable or returned an unexpected response", body = ErrorEnvelope),
    ),
    tag = "auth"
)]
#[instrument(skip(provider, payload))]
pub async fn login(
    provider: Extension<SharedProvider>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<SessionEnvelope>, ApiError> {
    let request = payload.map(|Json(request)| request).unwrap_or_default();

    let (Some(email), Some(password)) = (required(request.email), required(request.password))
    else {
        return Err(ApiError::missing_credentials());
    };

    match provider.verify_credentials(&email, &password).await {
        Ok(session) => Ok(Json(SessionEnvelope::new(session.account_id, session.token))),
        // Unknown account and wrong password must be indistinguishable.
        Err(ProviderError::Rejected { status, .. }) => {
            debug!(provider_status = status, "login refused");
            Err(ApiError::Auth(INVALID_CREDENTIALS))
        }
        Err(ProviderError::Unavailable(error)) => Err(ApiError::Unexpected {
            message: "Login failed",
            error,
        }),
    }
}
