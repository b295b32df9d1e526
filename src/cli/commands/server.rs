use super::provider;
use clap::{Arg, ArgMatches, Command};

pub const ARG_PORT: &str = "port";
pub const ARG_BASE_PATH: &str = "base-path";
pub const ARG_CORS_ORIGIN: &str = "cors-origin";

#[derive(Debug, Clone)]
pub struct Options {
    pub port: u16,
    pub base_path: Option<String>,
    pub cors_origin: Option<String>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            port: matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080),
            base_path: matches.get_one::<String>(ARG_BASE_PATH).cloned(),
            cors_origin: matches.get_one::<String>(ARG_CORS_ORIGIN).cloned(),
        }
    }
}

#[must_use]
pub fn subcommand() -> Command {
    let command = Command::new("server")
        .about("Run the authentication gateway")
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("SOMITI_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_BASE_PATH)
                .long(ARG_BASE_PATH)
                .help("Also serve the API under this prefix, example: /.netlify/functions/auth")
                .env("SOMITI_BASE_PATH"),
        )
        .arg(
            Arg::new(ARG_CORS_ORIGIN)
                .long(ARG_CORS_ORIGIN)
                .help("Allowed browser origins: `*` or a comma separated list")
                .long_help(
                    "Allowed browser origins: `*` or a comma separated list. Local development origins (http://localhost:<port>, http://192.168.x.x:<port>) are always allowed.",
                )
                .env("SOMITI_CORS_ORIGIN"),
        );

    provider::with_args(command)
}
