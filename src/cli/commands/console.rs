use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_GATEWAY_URL: &str = "gateway-url";
pub const ARG_REQUEST_TIMEOUT: &str = "request-timeout-seconds";
pub const ARG_DEMO_EMAIL: &str = "demo-email";
pub const ARG_DEMO_PASSWORD: &str = "demo-password";

#[derive(Debug, Clone)]
pub struct Options {
    pub gateway_url: String,
    pub request_timeout_seconds: u64,
    pub demo: Option<(String, SecretString)>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let demo = matches
            .get_one::<String>(ARG_DEMO_EMAIL)
            .cloned()
            .zip(matches.get_one::<String>(ARG_DEMO_PASSWORD).cloned())
            .map(|(email, password)| (email, SecretString::from(password)));

        Self {
            gateway_url: matches
                .get_one::<String>(ARG_GATEWAY_URL)
                .cloned()
                .unwrap_or_else(|| "http://localhost:8080".to_string()),
            request_timeout_seconds: matches
                .get_one::<u64>(ARG_REQUEST_TIMEOUT)
                .copied()
                .unwrap_or(10),
            demo,
        }
    }
}

#[must_use]
pub fn subcommand() -> Command {
    Command::new("console")
        .about("Interactive membership registration console")
        .arg(
            Arg::new(ARG_GATEWAY_URL)
                .long(ARG_GATEWAY_URL)
                .help("Gateway base URL, including any mount prefix")
                .env("SOMITI_GATEWAY_URL")
                .default_value("http://localhost:8080"),
        )
        .arg(
            Arg::new(ARG_REQUEST_TIMEOUT)
                .long(ARG_REQUEST_TIMEOUT)
                .help("Timeout for gateway requests")
                .env("SOMITI_REQUEST_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_DEMO_EMAIL)
                .long(ARG_DEMO_EMAIL)
                .help("Email of the account used by the `demo` login test")
                .env("SOMITI_DEMO_EMAIL")
                .requires(ARG_DEMO_PASSWORD),
        )
        .arg(
            Arg::new(ARG_DEMO_PASSWORD)
                .long(ARG_DEMO_PASSWORD)
                .help("Password of the demo account")
                .env("SOMITI_DEMO_PASSWORD")
                .hide_env_values(true)
                .requires(ARG_DEMO_EMAIL),
        )
}
