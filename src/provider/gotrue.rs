//! GoTrue (Supabase Auth) REST client.
//!
//! Only three endpoints are used:
//! - `POST /auth/v1/signup`
//! - `POST /auth/v1/token?grant_type=password`
//! - `GET /auth/v1/user`

use super::{AccountSession, Identity, IdentityProvider, ProviderError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{Instrument, debug, info_span};
use url::Url;

const APIKEY_HEADER: &str = "apikey";

#[derive(Debug)]
pub struct GoTrueProvider {
    client: Client,
    auth_url: Url,
    anon_key: SecretString,
}

#[derive(Serialize)]
struct SignupRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: SignupMetadata<'a>,
}

#[derive(Serialize)]
struct SignupMetadata<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

// Signup answers with a session when auto-confirm is on, or with the bare
// user object while the confirmation email is pending.
#[derive(Deserialize)]
struct SessionResponse {
    access_token: Option<String>,
    user: Option<UserResponse>,
    id: Option<String>,
}

#[derive(Deserialize)]
struct UserResponse {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Deserialize, Default)]
struct UserMetadata {
    name: Option<String>,
}

#[derive(Deserialize, Default)]
struct ErrorResponse {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl GoTrueProvider {
    /// Build a client for the project at `base_url` (e.g. `https://xyz.supabase.co`).
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, anon_key: SecretString, timeout: Duration) -> Result<Self> {
        let auth_url = Url::parse(&format!("{}/auth/v1/", base_url.trim_end_matches('/')))
            .with_context(|| format!("Invalid provider URL: {base_url}"))?;

        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build provider HTTP client")?;

        Ok(Self {
            client,
            auth_url,
            anon_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.auth_url
            .join(path)
            .map_err(|err| ProviderError::Unavailable(format!("invalid provider endpoint: {err}")))
    }

    fn with_token(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder
            .header(APIKEY_HEADER, self.anon_key.expose_secret())
            .bearer_auth(token)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ProviderError> {
        let response = request
            .send()
            .await
            .map_err(|err| ProviderError::Unavailable(format!("provider request failed: {err}")))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|err| ProviderError::Unavailable(format!("invalid provider response: {err}")));
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(status, &body);
        debug!(status = status.as_u16(), "provider refused request");

        if status.is_client_error() {
            Err(ProviderError::rejected(status.as_u16(), message))
        } else {
            Err(ProviderError::Unavailable(format!(
                "provider returned {status}: {message}"
            )))
        }
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: ErrorResponse = serde_json::from_str(body).unwrap_or_default();
    parsed
        .msg
        .or(parsed.message)
        .or(parsed.error_description)
        .or(parsed.error)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("provider error")
                .to_string()
        })
}

#[async_trait]
impl IdentityProvider for GoTrueProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<AccountSession, ProviderError> {
        let url = self.endpoint("signup")?;
        let payload = SignupRequest {
            email,
            password,
            data: SignupMetadata { name },
        };
        let request = self
            .with_token(self.client.post(url), self.anon_key.expose_secret())
            .json(&payload);

        let span = info_span!("provider.signup", provider = "gotrue");
        let response: SessionResponse = self.send(request).instrument(span).await?;

        let account_id = response.user.map(|user| user.id).or(response.id);

        Ok(AccountSession {
            account_id,
            token: response.access_token,
        })
    }

    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountSession, ProviderError> {
        let mut url = self.endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let request = self
            .with_token(self.client.post(url), self.anon_key.expose_secret())
            .json(&PasswordGrant { email, password });

        let span = info_span!("provider.token", provider = "gotrue", grant_type = "password");
        let response: SessionResponse = self.send(request).instrument(span).await?;

        Ok(AccountSession {
            account_id: response.user.map(|user| user.id).or(response.id),
            token: response.access_token,
        })
    }

    async fn resolve_identity(&self, token: &str) -> Result<Identity, ProviderError> {
        let url = self.endpoint("user")?;
        let request = self.with_token(self.client.get(url), token);

        let span = info_span!("provider.user", provider = "gotrue");
        let user: UserResponse = self.send(request).instrument(span).await?;

        Ok(Identity {
            id: user.id,
            email: user.email.unwrap_or_default(),
            name: user.user_metadata.name,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ANON_KEY: &str = "anon-key";

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn provider(server: &MockServer) -> GoTrueProvider {
        GoTrueProvider::new(
            &server.uri(),
            SecretString::from(ANON_KEY.to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_invalid_url() {
        let result = GoTrueProvider::new(
            "not a url",
            SecretString::from(ANON_KEY.to_string()),
            Duration::from_secs(5),
        );
        assert!(result.is_err());
    }

    #[test]
    fn error_message_prefers_msg_then_description() {
        assert_eq!(
            error_message(StatusCode::UNPROCESSABLE_ENTITY, r#"{"msg":"User already registered"}"#),
            "User already registered"
        );
        assert_eq!(
            error_message(
                StatusCode::BAD_REQUEST,
                r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#
            ),
            "Invalid login credentials"
        );
        assert_eq!(error_message(StatusCode::FORBIDDEN, "<html>"), "Forbidden");
    }

    #[test]
    fn debug_redacts_anon_key() {
        let provider = GoTrueProvider::new(
            "https://project.supabase.co",
            SecretString::from(ANON_KEY.to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(!format!("{provider:?}").contains(ANON_KEY));
    }

    #[tokio::test]
    async fn create_account_returns_session() -> anyhow::Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .and(header("apikey", ANON_KEY))
            .and(header("authorization", "Bearer anon-key"))
            .and(body_json(json!({
                "email": "rahim@example.com",
                "password": "secret123",
                "data": { "name": "Rahim" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "jwt-token",
                "token_type": "bearer",
                "user": { "id": "user-1", "email": "rahim@example.com" }
            })))
            .mount(&server)
            .await;

        let session = provider(&server)
            .create_account("rahim@example.com", "secret123", Some("Rahim"))
            .await?;
        assert_eq!(session.account_id.as_deref(), Some("user-1"));
        assert_eq!(session.token.as_deref(), Some("jwt-token"));
        Ok(())
    }

    #[tokio::test]
    async fn create_account_pending_confirmation_has_no_token() -> anyhow::Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "user-2",
                "email": "karim@example.com",
                "confirmation_sent_at": "2024-01-01T00:00:00Z"
            })))
            .mount(&server)
            .await;

        let session = provider(&server)
            .create_account("karim@example.com", "secret123", None)
            .await?;
        assert_eq!(session.account_id.as_deref(), Some("user-2"));
        assert_eq!(session.token, None);
        Ok(())
    }

    #[tokio::test]
    async fn create_account_duplicate_is_rejected() -> anyhow::Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "code": 422,
                "error_code": "user_already_exists",
                "msg": "User already registered"
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .create_account("rahim@example.com", "secret123", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Rejected { status: 422, ref message } if message == "User already registered"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn verify_credentials_uses_password_grant() -> anyhow::Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(body_json(json!({
                "email": "rahim@example.com",
                "password": "secret123"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "jwt-login",
                "user": { "id": "user-1", "email": "rahim@example.com" }
            })))
            .mount(&server)
            .await;

        let session = provider(&server)
            .verify_credentials("rahim@example.com", "secret123")
            .await?;
        assert_eq!(session.account_id.as_deref(), Some("user-1"));
        assert_eq!(session.token.as_deref(), Some("jwt-login"));
        Ok(())
    }

    #[tokio::test]
    async fn verify_credentials_bad_password_is_rejected() -> anyhow::Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .verify_credentials("rahim@example.com", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Rejected { status: 400, .. }));
        assert_eq!(err.to_string(), "Invalid login credentials");
        Ok(())
    }

    #[tokio::test]
    async fn resolve_identity_sends_user_token() -> anyhow::Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("apikey", ANON_KEY))
            .and(header("authorization", "Bearer user-jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "user-1",
                "email": "rahim@example.com",
                "user_metadata": { "name": "Rahim" }
            })))
            .mount(&server)
            .await;

        let identity = provider(&server).resolve_identity("user-jwt").await?;
        assert_eq!(
            identity,
            Identity {
                id: "user-1".to_string(),
                email: "rahim@example.com".to_string(),
                name: Some("Rahim".to_string()),
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn resolve_identity_without_metadata_has_no_name() -> anyhow::Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "user-3",
                "email": "nobody@example.com"
            })))
            .mount(&server)
            .await;

        let identity = provider(&server).resolve_identity("user-jwt").await?;
        assert_eq!(identity.name, None);
        Ok(())
    }

    #[tokio::test]
    async fn server_errors_are_unavailable() -> anyhow::Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let err = provider(&server).resolve_identity("user-jwt").await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
        assert!(err.to_string().contains("503"));
        Ok(())
    }

    #[tokio::test]
    async fn undecodable_success_body_is_unavailable() -> anyhow::Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = provider(&server).resolve_identity("user-jwt").await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
        Ok(())
    }
}
