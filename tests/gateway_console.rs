//! End to end: the gateway served over TCP with the in-memory provider,
//! driven through the console's HTTP client.

#![allow(clippy::unwrap_used)]

use somiti::{
    api::{self, OriginPolicy},
    console::{
        GatewayApi, GatewayClient, MemberConsole, MemberForm, Reply, StatusMessage, SubmitOutcome,
    },
    provider::{MemoryProvider, SharedProvider},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;

const PREFIX: &str = "/.netlify/functions/auth";

async fn spawn_gateway() -> Option<SocketAddr> {
    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        eprintln!("Skipping test: cannot bind localhost");
        return None;
    };
    let addr = listener.local_addr().ok()?;

    let provider: SharedProvider = Arc::new(MemoryProvider::new());
    let cors = OriginPolicy::parse(None).unwrap();
    let app = api::app(provider, &cors, Some(PREFIX));

    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service()).await;
    });

    Some(addr)
}

fn client(addr: SocketAddr, prefix: &str) -> GatewayClient {
    GatewayClient::new(&format!("http://{addr}{prefix}"), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn console_registers_members_through_gateway() {
    let Some(addr) = spawn_gateway().await else {
        return;
    };
    let console = MemberConsole::new(client(addr, PREFIX));

    let emails = ["rahim@example.com", "karim@example.com", "salma@example.com"];
    for email in emails {
        console.set_email(email);
        console.set_password("secret123");
        assert!(matches!(
            console.submit().await,
            SubmitOutcome::Registered(_)
        ));
        assert_eq!(console.form(), MemberForm::default());
    }

    let members = console.members();
    assert_eq!(
        members.iter().map(|m| m.email.as_str()).collect::<Vec<_>>(),
        emails
    );
    assert!(members.iter().all(|m| m.id.is_some() && m.token.is_some()));

    // duplicate email is refused by the provider and surfaced verbatim
    console.set_email("rahim@example.com");
    console.set_password("secret123");
    assert_eq!(
        console.submit().await,
        SubmitOutcome::Rejected("User already registered".to_string())
    );
    assert_eq!(console.members().len(), 3);

    let message = console.login_test(1, "secret123").await;
    assert!(
        message.text.starts_with("Login successful! Token: "),
        "{message:?}"
    );

    assert_eq!(
        console.login_test(1, "wrong").await,
        StatusMessage::error("Login error: Invalid email or password")
    );

    assert_eq!(
        console.profile(2).await,
        StatusMessage::success("Profile: salma@example.com")
    );
}

#[tokio::test]
async fn register_then_profile_returns_same_identity() {
    let Some(addr) = spawn_gateway().await else {
        return;
    };
    // routes are served both at the root and under the prefix
    let gateway = client(addr, "");

    let Reply::Ok(session) = gateway
        .register("nadia@example.com", "secret123", Some("Nadia"))
        .await
        .unwrap()
    else {
        panic!("registration failed");
    };

    let Reply::Ok(profile) = gateway
        .profile(session.token.as_deref().unwrap())
        .await
        .unwrap()
    else {
        panic!("profile failed");
    };

    assert_eq!(Some(profile.id), session.user_id);
    assert_eq!(profile.email, "nadia@example.com");
    assert_eq!(profile.name.as_deref(), Some("Nadia"));
}

#[tokio::test]
async fn gateway_failures_arrive_as_envelopes() {
    let Some(addr) = spawn_gateway().await else {
        return;
    };
    let gateway = client(addr, PREFIX);

    assert_eq!(
        gateway.login("ghost@example.com", "secret123").await.unwrap(),
        Reply::Failed {
            status: 401,
            message: "Invalid email or password".to_string()
        }
    );
    assert_eq!(
        gateway.register("", "secret123", None).await.unwrap(),
        Reply::Failed {
            status: 400,
            message: "Missing email or password".to_string()
        }
    );
    assert_eq!(
        gateway.profile("not-a-token").await.unwrap(),
        Reply::Failed {
            status: 401,
            message: "Invalid token".to_string()
        }
    );
}
