//! Effects produced by the message center and the sink they are emitted into.

use tokio::sync::mpsc;
use tracing::debug;

use crate::session::SessionId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Write `text` to the connection behind `session`.
    Deliver { session: SessionId, text: String },
    /// Control input typed by a session, addressed to a sender.
    SenderCommand { sender: String, command: String },
}

/// Receives outbound effects from the message center.
///
/// `emit` is called while the center holds its lock, in the order the effects
/// were produced. Implementations must not call back into the center.
pub trait OutboundSink: Send + Sync {
    fn emit(&self, event: Outbound);
}

impl OutboundSink for mpsc::UnboundedSender<Outbound> {
    fn emit(&self, event: Outbound) {
        if let Err(err) = self.send(event) {
            debug!(event = ?err.0, "outbound receiver dropped");
        }
    }
}
