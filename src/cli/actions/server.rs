use crate::{
    api::{self, GatewayConfig, OriginPolicy},
    cli::commands::provider::{Options as ProviderOptions, ProviderKind},
    provider::{GoTrueProvider, MemoryProvider, SharedProvider},
};
use anyhow::{Context, Result, anyhow};
use std::{fmt::Write as _, sync::Arc, time::Duration};
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub base_path: Option<String>,
    pub cors_origin: Option<String>,
    pub provider: ProviderOptions,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the provider or CORS settings are invalid, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let provider = build_provider(&args.provider)?;
    let cors = OriginPolicy::parse(args.cors_origin.as_deref())?;
    let base_path = match args.base_path.as_deref() {
        Some(path) => api::normalize_base_path(path)?,
        None => None,
    };

    api::new(
        GatewayConfig {
            port: args.port,
            base_path,
            cors,
        },
        provider,
    )
    .await
}

fn build_provider(options: &ProviderOptions) -> Result<SharedProvider> {
    match options.kind {
        ProviderKind::GoTrue => {
            let url = options
                .url
                .as_deref()
                .ok_or_else(|| anyhow!("Identity provider URL is required"))?;
            let anon_key = options
                .anon_key
                .clone()
                .ok_or_else(|| anyhow!("Identity provider anon key is required"))?;

            let provider = GoTrueProvider::new(
                url,
                anon_key,
                Duration::from_secs(options.timeout_seconds),
            )
            .context("Could not build identity provider client")?;

            Ok(Arc::new(provider))
        }
        ProviderKind::Memory => {
            warn!("Using the in-memory identity provider: accounts are lost on exit");
            let provider = MemoryProvider::new();
            Ok(if options.require_confirmation {
                Arc::new(provider.with_confirmation_required())
            } else {
                Arc::new(provider)
            })
        }
    }
}

fn log_startup_args(args: &Args) {
    let provider = match args.provider.kind {
        ProviderKind::GoTrue => "gotrue",
        ProviderKind::Memory => "memory",
    };
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        (
            "base_path",
            args.base_path.clone().unwrap_or_else(|| "/".to_string()),
        ),
        (
            "cors_origin",
            args.cors_origin.clone().unwrap_or_else(|| "*".to_string()),
        ),
        ("provider", provider.to_string()),
        (
            "provider_url",
            args.provider
                .url
                .clone()
                .unwrap_or_else(|| "n/a".to_string()),
        ),
        (
            "provider_anon_key_set",
            args.provider.anon_key.is_some().to_string(),
        ),
        (
            "provider_timeout",
            format!("{}s", args.provider.timeout_seconds),
        ),
        (
            "require_confirmation",
            args.provider.require_confirmation.to_string(),
        ),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ = write!(message, "\n  {key}:{padding} {value}");
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::provider::IdentityProvider;
    use secrecy::SecretString;

    fn options(kind: ProviderKind) -> ProviderOptions {
        ProviderOptions {
            kind,
            url: None,
            anon_key: None,
            timeout_seconds: 5,
            require_confirmation: false,
        }
    }

    #[test]
    fn short_commit_truncates() {
        assert_eq!(short_commit("0123456789abcdef"), "0123456");
        assert_eq!(short_commit("abc"), "abc");
        assert_eq!(short_commit(" unknown "), "unknown");
    }

    #[test]
    fn memory_provider_needs_nothing() {
        assert!(build_provider(&options(ProviderKind::Memory)).is_ok());
    }

    #[tokio::test]
    async fn memory_provider_honors_confirmation_flag() {
        let mut confirm = options(ProviderKind::Memory);
        confirm.require_confirmation = true;

        let provider = build_provider(&confirm).unwrap();
        let session = provider
            .create_account("rahim@example.com", "secret123", None)
            .await
            .unwrap();
        assert!(session.account_id.is_some());
        assert_eq!(session.token, None);

        let provider = build_provider(&options(ProviderKind::Memory)).unwrap();
        let session = provider
            .create_account("rahim@example.com", "secret123", None)
            .await
            .unwrap();
        assert!(session.token.is_some());
    }

    #[test]
    fn gotrue_provider_requires_url_and_key() {
        assert!(build_provider(&options(ProviderKind::GoTrue)).is_err());

        let mut complete = options(ProviderKind::GoTrue);
        complete.url = Some("https://project.supabase.co".to_string());
        assert!(build_provider(&complete).is_err());

        complete.anon_key = Some(SecretString::from("anon-key"));
        assert!(build_provider(&complete).is_ok());
    }

    #[test]
    fn gotrue_provider_rejects_bad_url() {
        let mut bad = options(ProviderKind::GoTrue);
        bad.url = Some("not a url".to_string());
        bad.anon_key = Some(SecretString::from("anon-key"));
        assert!(build_provider(&bad).is_err());
    }
}
