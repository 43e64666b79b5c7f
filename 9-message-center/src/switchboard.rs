//! Routes the center's outbound effects to connections and in-process senders.
//!
//! Each connection and each attached sender owns one unbounded channel. The
//! center emits effects while holding its lock, and every channel has a single
//! consumer, so text reaches a connection in the order it was produced.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::sync::mpsc;
use tracing::debug;

use crate::{
    center::MessageCenter,
    outbound::{Outbound, OutboundSink},
    session::SessionId,
};

#[derive(Default)]
pub struct Switchboard {
    connections: Mutex<HashMap<SessionId, mpsc::UnboundedSender<String>>>,
    senders: Mutex<HashMap<String, mpsc::UnboundedSender<String>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Switchboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes deliveries for `id` into `outbox`, replacing any previous route.
    pub fn attach_connection(&self, id: SessionId, outbox: mpsc::UnboundedSender<String>) {
        lock(&self.connections).insert(id, outbox);
    }

    pub fn detach_connection(&self, id: SessionId) {
        lock(&self.connections).remove(&id);
    }

    pub fn attach_sender(&self, name: &str, inbox: mpsc::UnboundedSender<String>) {
        lock(&self.senders).insert(name.to_string(), inbox);
    }

    /// Drops the route for `name` if it still points at `inbox`. Returns
    /// `false` when another inbox has since been attached under that name.
    pub fn detach_sender(&self, name: &str, inbox: &mpsc::UnboundedSender<String>) -> bool {
        let mut senders = lock(&self.senders);
        match senders.get(name) {
            Some(current) if current.same_channel(inbox) => {
                senders.remove(name);
                true
            }
            _ => false,
        }
    }
}

impl OutboundSink for Switchboard {
    fn emit(&self, event: Outbound) {
        match event {
            Outbound::Deliver { session, text } => {
                let connections = lock(&self.connections);
                let delivered = connections
                    .get(&session)
                    .is_some_and(|outbox| outbox.send(text).is_ok());
                if !delivered {
                    debug!(session, "no open connection for delivery");
                }
            }
            Outbound::SenderCommand { sender, command } => {
                let senders = lock(&self.senders);
                let delivered = senders
                    .get(&sender)
                    .is_some_and(|inbox| inbox.send(command).is_ok());
                if !delivered {
                    debug!(%sender, "sender has no command inbox");
                }
            }
        }
    }
}

/// In-process handle used by application code to act as a sender.
///
/// Dropping the handle closes its command inbox but leaves the name
/// registered; call [`SenderHandle::detach`] to unregister it.
pub struct SenderHandle {
    name: String,
    center: Arc<MessageCenter<Switchboard>>,
    inbox: mpsc::UnboundedSender<String>,
    commands: mpsc::UnboundedReceiver<String>,
}

impl SenderHandle {
    /// Registers `name` with `center` and opens its command inbox.
    pub fn attach(center: Arc<MessageCenter<Switchboard>>, name: &str) -> Self {
        let (inbox, commands) = mpsc::unbounded_channel();
        center.sink().attach_sender(name, inbox.clone());
        center.register_sender(name);
        Self {
            name: name.to_string(),
            center,
            inbox,
            commands,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Publishes `text` to spying sessions and returns how many were reached.
    pub fn publish(&self, text: &str) -> usize {
        self.center.publish(&self.name, text, false)
    }

    /// Like [`SenderHandle::publish`], starting the message on a new line.
    pub fn publish_line(&self, text: &str) -> usize {
        self.center.publish(&self.name, text, true)
    }

    /// Waits for the next command a session addressed to this sender with
    /// `@<name> ...`. Once another handle attaches under the same name, new
    /// commands go to that handle instead.
    pub async fn next_command(&mut self) -> Option<String> {
        self.commands.recv().await
    }

    /// Unregisters the name, unless a newer handle has taken it over. In that
    /// case only this handle's inbox goes away.
    pub fn detach(self) {
        if self.center.sink().detach_sender(&self.name, &self.inbox) {
            self.center.unregister_sender(&self.name);
        }
    }
}
