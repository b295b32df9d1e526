//! Membership console view model.
//!
//! [`MemberConsole`] owns the registration form, the members registered
//! during this session and the status banner. State sits behind a mutex that
//! is only held for short synchronous sections, never across a gateway call.

pub mod banner;
pub mod client;
pub mod terminal;

pub use banner::{MessageBanner, MessageKind, StatusMessage};
pub use client::{ConsoleError, GatewayApi, GatewayClient, Profile, Reply, Session};

use chrono::{DateTime, Utc};
use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tracing::{debug, warn};

pub const MISSING_FIELDS: &str = "Email and password are required";
pub const REGISTERED: &str = "Member registered successfully!";
pub const NO_DEMO_ACCOUNT: &str = "No demo account configured";

/// Token characters shown after a successful login test.
const TOKEN_PREVIEW_CHARS: usize = 20;

#[derive(Clone, Default, PartialEq, Eq)]
pub struct MemberForm {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl fmt::Debug for MemberForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberForm")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("name", &self.name)
            .finish()
    }
}

impl MemberForm {
    fn is_complete(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }

    fn name(&self) -> Option<&str> {
        let name = self.name.trim();
        (!name.is_empty()).then_some(name)
    }
}

/// A member registered through this console.
#[derive(Clone, PartialEq, Eq)]
pub struct MemberRecord {
    pub id: Option<String>,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub token: Option<String>,
}

impl fmt::Debug for MemberRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("created_at", &self.created_at)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty email or password; nothing was sent.
    Incomplete,
    /// Another submission is still in flight; nothing was sent.
    Busy,
    Registered(MemberRecord),
    Rejected(String),
    Failed(ConsoleError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Submitting,
}

#[derive(Clone)]
pub struct DemoAccount {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for DemoAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DemoAccount")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Snapshot used for rendering.
#[derive(Clone, Debug)]
pub struct ConsoleView {
    pub form: MemberForm,
    pub members: Vec<MemberRecord>,
    pub message: Option<StatusMessage>,
    pub phase: Phase,
}

#[derive(Default)]
struct ConsoleState {
    form: MemberForm,
    members: Vec<MemberRecord>,
    submitting: bool,
}

pub struct MemberConsole<G> {
    gateway: G,
    state: Mutex<ConsoleState>,
    banner: MessageBanner,
    demo: Option<DemoAccount>,
}

/// Clears the submitting flag even if the submit future is dropped.
struct Submitting<'a> {
    state: &'a Mutex<ConsoleState>,
}

impl Drop for Submitting<'_> {
    fn drop(&mut self) {
        lock(self.state).submitting = false;
    }
}

fn lock(state: &Mutex<ConsoleState>) -> MutexGuard<'_, ConsoleState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn token_preview(token: &str) -> String {
    token.chars().take(TOKEN_PREVIEW_CHARS).collect()
}

impl<G: GatewayApi> MemberConsole<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            state: Mutex::new(ConsoleState::default()),
            banner: MessageBanner::default(),
            demo: None,
        }
    }

    #[must_use]
    pub fn with_demo_account(mut self, demo: Option<DemoAccount>) -> Self {
        self.demo = demo;
        self
    }

    #[must_use]
    pub fn with_message_window(mut self, window: Duration) -> Self {
        self.banner = MessageBanner::new(window);
        self
    }

    pub fn set_email(&self, email: impl Into<String>) {
        lock(&self.state).form.email = email.into();
    }

    pub fn set_password(&self, password: impl Into<String>) {
        lock(&self.state).form.password = password.into();
    }

    pub fn set_name(&self, name: impl Into<String>) {
        lock(&self.state).form.name = name.into();
    }

    #[must_use]
    pub fn form(&self) -> MemberForm {
        lock(&self.state).form.clone()
    }

    #[must_use]
    pub fn members(&self) -> Vec<MemberRecord> {
        lock(&self.state).members.clone()
    }

    #[must_use]
    pub fn message(&self) -> Option<StatusMessage> {
        self.banner.current()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        if lock(&self.state).submitting {
            Phase::Submitting
        } else {
            Phase::Idle
        }
    }

    #[must_use]
    pub fn has_demo_account(&self) -> bool {
        self.demo.is_some()
    }

    #[must_use]
    pub fn view(&self) -> ConsoleView {
        let state = lock(&self.state);
        ConsoleView {
            form: state.form.clone(),
            members: state.members.clone(),
            message: self.banner.current(),
            phase: if state.submitting {
                Phase::Submitting
            } else {
                Phase::Idle
            },
        }
    }

    /// Register the member currently in the form.
    pub async fn submit(&self) -> SubmitOutcome {
        let (form, _submitting) = {
            let mut state = lock(&self.state);
            if state.submitting {
                return SubmitOutcome::Busy;
            }
            if !state.form.is_complete() {
                drop(state);
                self.banner.show(StatusMessage::error(MISSING_FIELDS));
                return SubmitOutcome::Incomplete;
            }
            state.submitting = true;
            (
                state.form.clone(),
                Submitting { state: &self.state },
            )
        };

        debug!(email = %form.email, "Registering member");

        let result = self
            .gateway
            .register(form.email.trim(), &form.password, form.name())
            .await;

        match result {
            Ok(Reply::Ok(session)) => {
                let record = MemberRecord {
                    id: session.user_id,
                    email: form.email.trim().to_string(),
                    created_at: Utc::now(),
                    token: session.token,
                };
                {
                    let mut state = lock(&self.state);
                    state.members.push(record.clone());
                    state.form = MemberForm::default();
                }
                self.banner.show(StatusMessage::success(REGISTERED));
                SubmitOutcome::Registered(record)
            }
            Ok(Reply::Failed { message, .. }) => {
                self.banner
                    .show(StatusMessage::error(format!("Registration failed: {message}")));
                SubmitOutcome::Rejected(message)
            }
            Err(err) => {
                warn!("Registration request failed: {err}");
                self.banner
                    .show(StatusMessage::error(format!("Registration error: {err}")));
                SubmitOutcome::Failed(err)
            }
        }
    }

    /// Log in as member `index` (zero based) with an operator supplied password.
    pub async fn login_test(&self, index: usize, password: &str) -> StatusMessage {
        let Some(member) = self.member(index) else {
            return self.report(StatusMessage::error(format!(
                "No member #{}",
                index.saturating_add(1)
            )));
        };

        self.login(&member.email, password).await
    }

    /// Log in with the configured demo account.
    pub async fn login_demo(&self) -> StatusMessage {
        let Some(demo) = self.demo.clone() else {
            return self.report(StatusMessage::error(NO_DEMO_ACCOUNT));
        };

        self.login(&demo.email, &demo.password).await
    }

    /// Fetch the profile behind member `index`'s stored token.
    pub async fn profile(&self, index: usize) -> StatusMessage {
        let number = index.saturating_add(1);
        let Some(member) = self.member(index) else {
            return self.report(StatusMessage::error(format!("No member #{number}")));
        };
        let Some(token) = member.token else {
            return self.report(StatusMessage::error(format!(
                "Member #{number} has no session token"
            )));
        };

        let message = match self.gateway.profile(&token).await {
            Ok(Reply::Ok(profile)) => StatusMessage::success(match profile.name {
                Some(name) => format!("Profile: {} ({name})", profile.email),
                None => format!("Profile: {}", profile.email),
            }),
            Ok(Reply::Failed { message, .. }) => {
                StatusMessage::error(format!("Profile error: {message}"))
            }
            Err(err) => StatusMessage::error(format!("Profile error: {err}")),
        };

        self.report(message)
    }

    async fn login(&self, email: &str, password: &str) -> StatusMessage {
        let message = match self.gateway.login(email, password).await {
            Ok(Reply::Ok(session)) => StatusMessage::success(match session.token {
                Some(token) => format!("Login successful! Token: {}...", token_preview(&token)),
                None => "Login successful!".to_string(),
            }),
            Ok(Reply::Failed { message, .. }) => {
                StatusMessage::error(format!("Login error: {message}"))
            }
            Err(err) => StatusMessage::error(format!("Login error: {err}")),
        };

        self.report(message)
    }

    fn member(&self, index: usize) -> Option<MemberRecord> {
        lock(&self.state).members.get(index).cloned()
    }

    fn report(&self, message: StatusMessage) -> StatusMessage {
        self.banner.show(message.clone());
        message
    }
}
