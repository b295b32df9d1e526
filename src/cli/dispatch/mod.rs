//! Map validated CLI matches to the action to run.

use crate::cli::actions::{Action, console, server};
use crate::cli::commands::{console as console_args, provider, server as server_args};
use anyhow::{Result, anyhow};

/// # Errors
/// Returns an error if no subcommand was given or provider settings are inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some(("server", sub)) => {
            let options = server_args::Options::parse(sub);
            Ok(Action::Server(server::Args {
                port: options.port,
                base_path: options.base_path,
                cors_origin: options.cors_origin,
                provider: provider::Options::parse(sub)?,
            }))
        }
        Some(("console", sub)) => {
            let options = console_args::Options::parse(sub);
            Ok(Action::Console(console::Args {
                gateway_url: options.gateway_url,
                request_timeout_seconds: options.request_timeout_seconds,
                demo: options.demo,
            }))
        }
        Some((other, _)) => Err(anyhow!("unknown subcommand: {other}")),
        None => Err(anyhow!("missing subcommand: server or console")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use crate::cli::commands::provider::ProviderKind;
    use secrecy::ExposeSecret;

    #[test]
    fn server_action_with_gotrue() {
        temp_env::with_vars(
            [
                ("SUPABASE_URL", Some("https://project.supabase.co")),
                ("SUPABASE_ANON_KEY", Some("anon-key")),
                ("SOMITI_PROVIDER", None),
                ("SOMITI_BASE_PATH", None),
                ("SOMITI_PORT", None),
            ],
            || {
                let matches = commands::new().get_matches_from(["somiti", "server"]);
                let Action::Server(args) = handler(&matches).unwrap() else {
                    panic!("expected server action");
                };
                assert_eq!(args.port, 8080);
                assert_eq!(args.base_path, None);
                assert_eq!(args.provider.kind, ProviderKind::GoTrue);
                assert_eq!(
                    args.provider.anon_key.as_ref().map(|k| k.expose_secret().to_string()),
                    Some("anon-key".to_string())
                );
            },
        );
    }

    #[test]
    fn server_action_without_provider_url_fails() {
        temp_env::with_vars(
            [
                ("SUPABASE_URL", None::<&str>),
                ("SUPABASE_ANON_KEY", None),
                ("SOMITI_PROVIDER", None),
            ],
            || {
                let matches = commands::new().get_matches_from(["somiti", "server"]);
                assert!(handler(&matches).is_err());
            },
        );
    }

    #[test]
    fn console_action() {
        temp_env::with_vars(
            [
                ("SOMITI_GATEWAY_URL", Some("http://127.0.0.1:9999/api")),
                ("SOMITI_DEMO_EMAIL", None),
                ("SOMITI_DEMO_PASSWORD", None),
            ],
            || {
                let matches = commands::new().get_matches_from(["somiti", "console"]);
                let Action::Console(args) = handler(&matches).unwrap() else {
                    panic!("expected console action");
                };
                assert_eq!(args.gateway_url, "http://127.0.0.1:9999/api");
                assert!(args.demo.is_none());
            },
        );
    }

    #[test]
    fn args_debug_redacts_secrets() {
        temp_env::with_vars(
            [
                ("SUPABASE_URL", Some("https://project.supabase.co")),
                ("SUPABASE_ANON_KEY", Some("very-secret-anon-key")),
                ("SOMITI_PROVIDER", None),
            ],
            || {
                let matches = commands::new().get_matches_from(["somiti", "server"]);
                let action = handler(&matches).unwrap();
                assert!(!format!("{action:?}").contains("very-secret-anon-key"));
            },
        );
    }
}
