use anyhow::{Result, anyhow};
use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_PROVIDER: &str = "provider";
pub const ARG_PROVIDER_URL: &str = "provider-url";
pub const ARG_PROVIDER_ANON_KEY: &str = "provider-anon-key";
pub const ARG_PROVIDER_TIMEOUT: &str = "provider-timeout-seconds";
pub const ARG_MEMORY_REQUIRE_CONFIRMATION: &str = "memory-require-confirmation";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    GoTrue,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Options {
    pub kind: ProviderKind,
    pub url: Option<String>,
    pub anon_key: Option<SecretString>,
    pub timeout_seconds: u64,
    /// Only used by the memory provider.
    pub require_confirmation: bool,
}

impl Options {
    /// Parse identity provider arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the `gotrue` provider is selected without a URL or anon key.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let kind = match matches.get_one::<String>(ARG_PROVIDER).map(String::as_str) {
            Some("memory") => ProviderKind::Memory,
            _ => ProviderKind::GoTrue,
        };

        let read_optional = |id: &str| {
            matches
                .get_one::<String>(id)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let url = read_optional(ARG_PROVIDER_URL);
        let anon_key = read_optional(ARG_PROVIDER_ANON_KEY).map(SecretString::from);

        if kind == ProviderKind::GoTrue {
            if url.is_none() {
                return Err(anyhow!(
                    "missing required argument: --{ARG_PROVIDER_URL} (required for the gotrue provider)"
                ));
            }
            if anon_key.is_none() {
                return Err(anyhow!(
                    "missing required argument: --{ARG_PROVIDER_ANON_KEY} (required for the gotrue provider)"
                ));
            }
        }

        Ok(Self {
            kind,
            url,
            anon_key,
            timeout_seconds: matches
                .get_one::<u64>(ARG_PROVIDER_TIMEOUT)
                .copied()
                .unwrap_or(10),
            require_confirmation: matches.get_flag(ARG_MEMORY_REQUIRE_CONFIRMATION),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PROVIDER)
                .long(ARG_PROVIDER)
                .help("Identity provider backend")
                .long_help(
                    "Identity provider backend. `gotrue` talks to a Supabase Auth / GoTrue server; `memory` keeps accounts in process and is meant for local development.",
                )
                .env("SOMITI_PROVIDER")
                .default_value("gotrue")
                .value_parser(["gotrue", "memory"]),
        )
        .arg(
            Arg::new(ARG_PROVIDER_URL)
                .long(ARG_PROVIDER_URL)
                .help("Identity provider base URL, example: https://<project>.supabase.co")
                .env("SUPABASE_URL"),
        )
        .arg(
            Arg::new(ARG_PROVIDER_ANON_KEY)
                .long(ARG_PROVIDER_ANON_KEY)
                .help("Identity provider public (anon) API key")
                .env("SUPABASE_ANON_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_PROVIDER_TIMEOUT)
                .long(ARG_PROVIDER_TIMEOUT)
                .help("Timeout for identity provider requests")
                .env("SOMITI_PROVIDER_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_MEMORY_REQUIRE_CONFIRMATION)
                .long(ARG_MEMORY_REQUIRE_CONFIRMATION)
                .help("Memory provider: hold signups until confirmed, like GoTrue with email confirmation on")
                .env("SOMITI_MEMORY_REQUIRE_CONFIRMATION")
                .action(ArgAction::SetTrue),
        )
}
