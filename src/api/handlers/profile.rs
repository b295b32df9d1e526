use super::{ApiError, ErrorEnvelope, INVALID_AUTHORIZATION, INVALID_TOKEN, bearer_token};
use crate::provider::{Identity, ProviderError, SharedProvider};
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ProfileUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ProfileEnvelope {
    pub success: bool,
    pub user: ProfileUser,
}

impl From<Identity> for ProfileEnvelope {
    fn from(identity: Identity) -> Self {
        Self {
            success: true,
            user: ProfileUser {
                id: identity.id,
                email: identity.email,
                name: identity.name,
            },
        }
    }
}

#[utoipa::path(
    get,
    path = "/profile",
    responses (
        (status = 200, description = "Identity behind the bearer token", body = ProfileEnvelope),
        (status = 401, description = "Missing or invalid Authorization header, or the token was refused", body = ErrorEnvelope),
        (status = 500, description = "Provider unreachable or returned an unexpected response", body = ErrorEnvelope),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip(provider, headers))]
pub async fn profile(
    provider: Extension<SharedProvider>,
    headers: HeaderMap,
) -> Result<Json<ProfileEnvelope>, ApiError> {
    let token = bearer_token(&headers).ok_or(ApiError::Validation {
        status: StatusCode::UNAUTHORIZED,
        message: INVALID_AUTHORIZATION,
    })?;

    match provider.resolve_identity(token).await {
        Ok(identity) => Ok(Json(identity.into())),
        Err(ProviderError::Rejected { status, .. }) => {
            debug!(provider_status = status, "token refused");
            Err(ApiError::Auth(INVALID_TOKEN))
        }
        Err(ProviderError::Unavailable(error)) => Err(ApiError::Unexpected {
            message: "Profile fetch failed",
            error,
        }),
    }
}
