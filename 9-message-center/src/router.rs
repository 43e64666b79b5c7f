//! Fan-out of published messages to spying sessions.

use crate::{outbound::Outbound, session::SessionRegistry};

pub const SEPARATOR: char = '\n';

/// Formats a published message as `"<sender>: <text>"`, optionally preceded by
/// a line separator.
pub fn compose(sender: &str, text: &str, prepend_separator: bool) -> String {
    let mut composed = String::with_capacity(sender.len() + text.len() + 3);
    if prepend_separator {
        composed.push(SEPARATOR);
    }
    composed.push_str(sender);
    composed.push_str(": ");
    composed.push_str(text);
    composed
}

/// Builds one delivery per session spying on `sender`, in connect order.
///
/// Whether `sender` is registered does not matter; an unknown sender simply
/// has no subscribers, unless sessions are still spying on it after it left.
pub fn route(
    sessions: &SessionRegistry,
    sender: &str,
    text: &str,
    prepend_separator: bool,
) -> Vec<Outbound> {
    let composed = compose(sender, text, prepend_separator);
    sessions
        .subscribers(sender)
        .map(|session| Outbound::Deliver {
            session,
            text: composed.clone(),
        })
        .collect()
}
