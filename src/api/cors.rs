//! Cross-origin policy for browser consoles.
//!
//! The allow-list comes from a comma-separated string. No list, or a `*`
//! entry, allows every origin. Otherwise an origin passes when it is listed
//! verbatim or looks like a development host (`http://localhost:<port>` or a
//! `192.168.x.x` address on any port).

use anyhow::{Context, Result};
use axum::http::{
    HeaderValue, Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
    request::Parts,
};
use regex::Regex;
use tower_http::cors::{AllowOrigin, CorsLayer};

const DEVELOPMENT_ORIGIN: &str = r"^http://(localhost|192\.168\..*):\d+$";

#[derive(Clone, Debug)]
pub struct OriginPolicy {
    allowed: Vec<String>,
    wildcard: bool,
    development: Regex,
}

impl OriginPolicy {
    /// Parse an allow-list such as `https://somiti.dev, https://admin.somiti.dev`.
    ///
    /// # Errors
    /// Returns an error if the development origin pattern fails to compile.
    pub fn parse(list: Option<&str>) -> Result<Self> {
        let allowed: Vec<String> = list
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let wildcard = allowed.is_empty() || allowed.iter().any(|origin| origin == "*");

        Ok(Self {
            allowed,
            wildcard,
            development: Regex::new(DEVELOPMENT_ORIGIN)
                .context("Invalid development origin pattern")?,
        })
    }

    #[must_use]
    pub const fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    #[must_use]
    pub fn allows(&self, origin: &str) -> bool {
        self.wildcard
            || self.allowed.iter().any(|allowed| allowed == origin)
            || self.development.is_match(origin)
    }

    /// Build the tower-http layer. Allowed origins are echoed back with
    /// credentials enabled; others get no CORS headers at all.
    #[must_use]
    pub fn layer(&self) -> CorsLayer {
        let policy = self.clone();

        CorsLayer::new()
            .allow_headers([CONTENT_TYPE, AUTHORIZATION])
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_origin(AllowOrigin::predicate(
                move |origin: &HeaderValue, _parts: &Parts| {
                    origin.to_str().is_ok_and(|origin| policy.allows(origin))
                },
            ))
            .allow_credentials(true)
    }
}
