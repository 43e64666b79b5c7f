//! Applies one line of session input to the registries.
//!
//! [`dispatch`] is the per-session state machine. A session is either in
//! console mode or spying on exactly one sender:
//!
//! - a blank line always returns it to console mode;
//! - `spy <sender>` and `@<sender> ...` move it to spying on a registered
//!   sender, and leave it alone when the sender is unknown;
//! - every other verb only produces a reply.
//!
//! Mutations use copy, modify, write back through
//! [`SessionRegistry::replace`]. The caller is expected to hold the center's
//! lock for the whole call so the transition is observed atomically.

use tracing::debug;

use crate::{
    command::{Command, EXIT_REPLY, HELP, PONG},
    outbound::Outbound,
    sender::SenderRegistry,
    session::{Session, SessionId, SessionMode, SessionRegistry},
};

/// Interactive cue appended to most replies. Empty for unknown sessions.
pub fn prompt(session: Option<&Session>) -> String {
    match session {
        Some(session) => format!("\n{}:> ", session.display_name),
        None => String::new(),
    }
}

pub fn greeting(session: &Session) -> String {
    format!(
        "\n\nMessage Center {}\n\n{HELP}{}",
        env!("CARGO_PKG_VERSION"),
        prompt(Some(session))
    )
}

/// Parses `line` from session `id` and applies it.
///
/// Returns the effects to emit, in order. Lines from an id without a session
/// record still get text replies, but never create or change a session and
/// never reach a sender.
pub fn dispatch(
    sessions: &mut SessionRegistry,
    senders: &SenderRegistry,
    id: SessionId,
    line: &str,
) -> Vec<Outbound> {
    let command = Command::parse(line);
    let subscribed = sessions.find(id).and_then(Session::subscribed_sender);
    debug!(session = id, ?subscribed, ?command, "dispatching command");

    let reply = |text: String| {
        vec![Outbound::Deliver {
            session: id,
            text,
        }]
    };
    let prompt = prompt(sessions.find(id));

    match command {
        Command::Console => {
            set_mode(sessions, id, SessionMode::Console);
            reply(format!("\n{HELP}{prompt}"))
        }
        Command::Spy { sender: None } => Vec::new(),
        Command::Spy {
            sender: Some(sender),
        } => {
            if !senders.contains(&sender) {
                return reply(not_found(&sender, &prompt));
            }
            set_mode(sessions, id, SessionMode::Spying(sender));
            Vec::new()
        }
        Command::Exit => reply(EXIT_REPLY.to_string()),
        Command::List => reply(listing(senders, &prompt)),
        Command::Ping => reply(PONG.to_string()),
        Command::Help => reply(format!("\n{HELP}{prompt}")),
        Command::Forward { sender, command } => {
            if !senders.contains(&sender) {
                return reply(not_found(&sender, &prompt));
            }
            if !set_mode(sessions, id, SessionMode::Spying(sender.clone())) {
                debug!(session = id, %sender, "dropping command from unknown session");
                return Vec::new();
            }
            vec![Outbound::SenderCommand { sender, command }]
        }
        Command::Unknown { verb } => {
            if sessions.find(id).is_none() {
                return Vec::new();
            }
            reply(verb)
        }
    }
}

/// Returns `false` when there is no session to update.
fn set_mode(sessions: &mut SessionRegistry, id: SessionId, mode: SessionMode) -> bool {
    let Some(current) = sessions.find(id) else {
        return false;
    };
    let updated = Session {
        mode,
        ..current.clone()
    };
    sessions.replace(id, updated)
}

fn not_found(sender: &str, prompt: &str) -> String {
    format!("\nSender not found: {sender}{prompt}")
}

fn listing(senders: &SenderRegistry, prompt: &str) -> String {
    let mut text = String::from("\n");
    for name in senders.list() {
        text.push_str("   - ");
        text.push_str(&name);
        text.push('\n');
    }
    text.push_str(prompt);
    text
}
