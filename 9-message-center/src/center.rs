//! The message center: both registries behind one lock.
//!
//! Every operation takes the same mutex and emits its effects into the
//! [`OutboundSink`] before releasing it. A publish therefore reaches exactly
//! the sessions that were spying when it started, and a session never sees
//! its replies interleaved with another call's output in the wrong order.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::{
    dispatcher::{self, greeting},
    outbound::{Outbound, OutboundSink},
    router,
    sender::SenderRegistry,
    session::{Session, SessionId, SessionRegistry},
};

#[derive(Default)]
struct State {
    sessions: SessionRegistry,
    senders: SenderRegistry,
}

pub struct MessageCenter<S> {
    state: Mutex<State>,
    sink: S,
}

impl<S: OutboundSink> MessageCenter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            state: Mutex::new(State::default()),
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    // No operation leaves the registries half-updated, so a poisoned lock is
    // still consistent.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit_all(&self, effects: Vec<Outbound>) {
        for effect in effects {
            self.sink.emit(effect);
        }
    }

    /// Creates the session for `id` and greets it. Connecting an id that is
    /// already live changes nothing and sends nothing.
    pub fn connect(&self, id: SessionId) {
        let mut state = self.lock();
        let (session, created) = state.sessions.add(id);
        if created {
            info!(session = id, "session connected");
            self.sink.emit(Outbound::Deliver {
                session: id,
                text: greeting(session),
            });
        }
    }

    pub fn disconnect(&self, id: SessionId) {
        let mut state = self.lock();
        if state.sessions.remove(id).is_some() {
            info!(session = id, "session disconnected");
        }
    }

    /// Interprets one line typed by session `id`.
    pub fn handle_line(&self, id: SessionId, line: &str) {
        let mut state = self.lock();
        let State { sessions, senders } = &mut *state;
        let effects = dispatcher::dispatch(sessions, senders, id, line);
        self.emit_all(effects);
    }

    pub fn register_sender(&self, name: &str) {
        let mut state = self.lock();
        if state.senders.register(name) {
            info!(sender = name, senders = state.senders.len(), "sender registered");
        }
    }

    /// Forgets `name`. Sessions spying on it keep spying.
    pub fn unregister_sender(&self, name: &str) {
        let mut state = self.lock();
        if state.senders.unregister(name) {
            info!(sender = name, senders = state.senders.len(), "sender unregistered");
            if state.senders.is_empty() {
                debug!("no senders registered");
            }
        }
    }

    /// Sends `text` from `sender` to every session spying on it and returns
    /// how many sessions were reached.
    pub fn publish(&self, sender: &str, text: &str, prepend_separator: bool) -> usize {
        let state = self.lock();
        let effects = router::route(&state.sessions, sender, text, prepend_separator);
        let reached = effects.len();
        debug!(sender, reached, "publishing message");
        self.emit_all(effects);
        reached
    }

    pub fn senders(&self) -> Vec<String> {
        self.lock().senders.list()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.lock().senders.contains(name)
    }

    /// Snapshot of the session record for `id`.
    pub fn session(&self, id: SessionId) -> Option<Session> {
        self.lock().sessions.find(id).cloned()
    }

    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }
}
