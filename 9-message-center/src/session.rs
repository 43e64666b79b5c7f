//! Connected sessions and the registry that owns them.

use indexmap::IndexMap;

/// Opaque connection identifier handed out by the transport.
pub type SessionId = u64;

pub const DEFAULT_USER_NAME: &str = "Anonymous";

/// What a session is currently doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    /// Receives only direct replies to its own commands.
    Console,
    /// Receives every message published by the named sender.
    Spying(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub display_name: String,
    /// Identity placeholder, never checked.
    pub user_name: String,
    /// Reserved; no routing decision reads it.
    pub is_admin: bool,
    pub mode: SessionMode,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            display_name: id.to_string(),
            user_name: DEFAULT_USER_NAME.to_string(),
            is_admin: false,
            mode: SessionMode::Console,
        }
    }

    pub fn is_spying_on(&self, sender: &str) -> bool {
        matches!(&self.mode, SessionMode::Spying(current) if current == sender)
    }

    /// The sender this session is subscribed to, if any.
    pub fn subscribed_sender(&self) -> Option<&str> {
        match &self.mode {
            SessionMode::Spying(sender) => Some(sender),
            SessionMode::Console => None,
        }
    }
}

/// Live sessions keyed by id. Iteration follows connect order.
#[derive(Debug, Default, Clone)]
pub struct SessionRegistry {
    sessions: IndexMap<SessionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a default session for `id` unless one exists.
    ///
    /// Returns the stored record and whether it was created by this call. An
    /// existing record is returned untouched.
    pub fn add(&mut self, id: SessionId) -> (&Session, bool) {
        let created = !self.sessions.contains_key(&id);
        let session: &Session = self.sessions.entry(id).or_insert_with(|| Session::new(id));
        (session, created)
    }

    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        self.sessions.shift_remove(&id)
    }

    pub fn find(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Overwrites the record for an existing session. Unknown ids are ignored
    /// and reported with `false`.
    pub fn replace(&mut self, id: SessionId, session: Session) -> bool {
        match self.sessions.get_mut(&id) {
            Some(slot) => {
                *slot = session;
                true
            }
            None => false,
        }
    }

    /// Ids of sessions spying on `sender`, in connect order.
    pub fn subscribers<'a>(&'a self, sender: &'a str) -> impl Iterator<Item = SessionId> + 'a {
        self.sessions
            .values()
            .filter(move |session| session.is_spying_on(sender))
            .map(|session| session.id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
