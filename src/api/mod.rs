//! Auth gateway HTTP surface.
//!
//! The gateway is stateless: the only thing shared between requests is the
//! injected provider handle. Every route answers with a JSON envelope.

use crate::{
    api::handlers::{health, root},
    provider::SharedProvider,
};
use anyhow::{Result, anyhow};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, options},
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;
use utoipa_axum::router::OpenApiRouter;

pub mod cors;
pub mod handlers;
mod openapi;

pub use cors::OriginPolicy;
pub use openapi::openapi;

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Gateway settings resolved from the CLI.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    /// Extra mount point, e.g. `/.netlify/functions/auth`.
    pub base_path: Option<String>,
    pub cors: OriginPolicy,
}

/// Normalize a mount prefix to `/segment[/segment]`; `None` for the root.
///
/// # Errors
/// Returns an error if the prefix contains whitespace or a query/fragment.
pub fn normalize_base_path(path: &str) -> Result<Option<String>> {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Ok(None);
    }

    if trimmed.contains(|c: char| c.is_whitespace() || c == '?' || c == '#') {
        return Err(anyhow!("Invalid base path: {path}"));
    }

    Ok(Some(format!("/{trimmed}")))
}

/// Assemble the full application: documented routes behind the middleware
/// stack, the undocumented helpers, and the optional prefix mount.
///
/// `/` and `OPTIONS /health` are added after the layers so the CORS layer
/// does not answer the health preflight itself.
#[must_use]
pub fn app(provider: SharedProvider, cors: &OriginPolicy, base_path: Option<&str>) -> Router {
    let (router, _openapi) = router().split_for_parts();
    let routes = router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors.layer())
                .layer(Extension(provider)),
        )
        .route("/", get(root::root))
        .route("/health", options(health::health));

    match base_path {
        Some(prefix) => Router::new().merge(routes.clone()).nest(prefix, routes),
        None => routes,
    }
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(config: GatewayConfig, provider: SharedProvider) -> Result<()> {
    let app = app(provider, &config.cors, config.base_path.as_deref());

    let listener = TcpListener::bind(format!("::0:{}", config.port)).await?;

    info!(
        base_path = config.base_path.as_deref().unwrap_or("/"),
        cors_wildcard = config.cors.is_wildcard(),
        "Listening on [::]:{}",
        config.port
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_path_is_normalized() {
        assert_eq!(normalize_base_path("").unwrap(), None);
        assert_eq!(normalize_base_path("/").unwrap(), None);
        assert_eq!(
            normalize_base_path(".netlify/functions/auth/").unwrap(),
            Some("/.netlify/functions/auth".to_string())
        );
        assert_eq!(
            normalize_base_path("/api").unwrap(),
            Some("/api".to_string())
        );
    }

    #[test]
    fn base_path_rejects_queries_and_spaces() {
        assert!(normalize_base_path("/api?x=1").is_err());
        assert!(normalize_base_path("/my api").is_err());
    }
}
