//! Line oriented driver for [`MemberConsole`].

use super::{ConsoleView, GatewayApi, MemberConsole, MessageKind, Phase, SubmitOutcome};
use anyhow::Result;
use std::fmt::Write as _;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const HELP: &str = "\
Commands:
  email <address>          set the form email
  password <secret>        set the form password
  name <full name>         set the optional display name
  submit                   register the member in the form
  list                     show the banner and registered members
  login <n> <password>     test login as member n
  demo                     test login with the demo account
  profile <n>              fetch the profile of member n
  help                     show this help
  quit                     leave the console
";

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Email(String),
    Password(String),
    Name(String),
    Submit,
    List,
    Login { index: usize, password: String },
    Demo,
    Profile(usize),
    Help,
    Quit,
    Invalid(String),
}

/// Parse one input line; `None` for blank lines.
#[must_use]
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(word, rest)| (word, rest.trim()));

    let command = match word.to_ascii_lowercase().as_str() {
        "email" => Command::Email(rest.to_string()),
        "password" => Command::Password(rest.to_string()),
        "name" => Command::Name(rest.to_string()),
        "submit" => Command::Submit,
        "list" | "ls" => Command::List,
        "login" => {
            let (index, password) = rest
                .split_once(char::is_whitespace)
                .map_or((rest, ""), |(index, password)| (index, password.trim()));
            match (member_index(index), password.is_empty()) {
                (Some(index), false) => Command::Login {
                    index,
                    password: password.to_string(),
                },
                _ => Command::Invalid("usage: login <n> <password>".to_string()),
            }
        }
        "demo" => Command::Demo,
        "profile" => match member_index(rest) {
            Some(index) => Command::Profile(index),
            None => Command::Invalid("usage: profile <n>".to_string()),
        },
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Invalid(format!("unknown command: {other} (try help)")),
    };

    Some(command)
}

/// Members are numbered from 1 on screen.
fn member_index(input: &str) -> Option<usize> {
    input.parse::<usize>().ok()?.checked_sub(1)
}

#[must_use]
pub fn render(view: &ConsoleView) -> String {
    let mut out = String::new();

    if let Some(message) = &view.message {
        let tag = match message.kind {
            MessageKind::Success => "ok",
            MessageKind::Error => "error",
        };
        let _ = writeln!(out, "[{tag}] {}", message.text);
    }

    if view.phase == Phase::Submitting {
        out.push_str("Registering...\n");
    }

    if view.members.is_empty() {
        out.push_str("No members registered yet\n");
    } else {
        let _ = writeln!(out, "Registered members ({})", view.members.len());
        for (number, member) in (1..).zip(&view.members) {
            let _ = writeln!(
                out,
                "  {number}. {}  id={}  registered={}",
                member.email,
                member.id.as_deref().unwrap_or("-"),
                member.created_at.format("%Y-%m-%d"),
            );
        }
    }

    out
}

/// Read commands from `input` until EOF or `quit`, writing views to `output`.
///
/// # Errors
/// Returns an error if reading input or writing output fails.
pub async fn run<G, R, W>(console: &MemberConsole<G>, input: R, mut output: W) -> Result<()>
where
    G: GatewayApi,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    output.write_all(HELP.as_bytes()).await?;
    output.write_all(b"> ").await?;
    output.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let Some(command) = parse_command(&line) else {
            output.write_all(b"> ").await?;
            output.flush().await?;
            continue;
        };

        let reply = match command {
            Command::Email(email) => {
                console.set_email(email);
                None
            }
            Command::Password(password) => {
                console.set_password(password);
                None
            }
            Command::Name(name) => {
                console.set_name(name);
                None
            }
            Command::Submit => {
                if matches!(console.submit().await, SubmitOutcome::Busy) {
                    Some("A registration is already in progress\n".to_string())
                } else {
                    Some(render(&console.view()))
                }
            }
            Command::List => Some(render(&console.view())),
            Command::Login { index, password } => {
                console.login_test(index, &password).await;
                Some(render(&console.view()))
            }
            Command::Demo => {
                console.login_demo().await;
                Some(render(&console.view()))
            }
            Command::Profile(index) => {
                console.profile(index).await;
                Some(render(&console.view()))
            }
            Command::Help => Some(HELP.to_string()),
            Command::Quit => break,
            Command::Invalid(message) => Some(format!("{message}\n")),
        };

        if let Some(reply) = reply {
            output.write_all(reply.as_bytes()).await?;
        }
        output.write_all(b"> ").await?;
        output.flush().await?;
    }

    output.flush().await?;
    Ok(())
}
