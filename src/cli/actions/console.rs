use crate::console::{DemoAccount, GatewayClient, MemberConsole, terminal};
use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tokio::io::BufReader;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub gateway_url: String,
    pub request_timeout_seconds: u64,
    pub demo: Option<(String, SecretString)>,
}

/// Execute the console action.
/// # Errors
/// Returns an error if the gateway client cannot be built or the terminal fails.
pub async fn execute(args: Args) -> Result<()> {
    info!(
        gateway_url = %args.gateway_url,
        demo_account = args.demo.is_some(),
        "Starting membership console"
    );

    let client = GatewayClient::new(
        &args.gateway_url,
        Duration::from_secs(args.request_timeout_seconds),
    )?;

    let demo = args.demo.map(|(email, password)| DemoAccount {
        email,
        password: password.expose_secret().to_string(),
    });

    let console = MemberConsole::new(client).with_demo_account(demo);

    terminal::run(
        &console,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}
