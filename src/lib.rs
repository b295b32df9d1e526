//! # Somiti (membership console and auth gateway)
//!
//! `somiti` puts a thin, stateless authentication gateway in front of an
//! external identity provider (GoTrue / Supabase Auth) and ships a small
//! membership console that drives it.
//!
//! ## Gateway
//!
//! Three operations (`/register`, `/login`, `/profile`) each make exactly one
//! provider call and answer with a uniform JSON envelope
//! (`{"success": bool, ...}`). Login failures are always reported as
//! `Invalid email or password` so callers cannot probe for existing
//! accounts. `/health` is a static liveness probe.
//!
//! The gateway keeps no accounts, sessions or tokens of its own.
//!
//! ## Console
//!
//! [`console::MemberConsole`] holds a registration form, an in-memory list of
//! members registered during the session and a self-clearing status banner.
//! Nothing is persisted.

pub mod api;
pub mod cli;
pub mod console;
pub mod provider;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
