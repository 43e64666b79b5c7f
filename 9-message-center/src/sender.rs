//! Registry of message senders.
//!
//! A sender is nothing more than a name. The registry behaves like a set that
//! remembers insertion order, because `list` shows senders in the order they
//! registered.

use indexmap::IndexSet;

#[derive(Debug, Default, Clone)]
pub struct SenderRegistry {
    names: IndexSet<String>,
}

impl SenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `name` unless it is already known. Returns `true` if it was added.
    pub fn register(&mut self, name: &str) -> bool {
        if self.names.contains(name) {
            return false;
        }
        self.names.insert(name.to_string())
    }

    /// Removes `name` if present, keeping the order of the remaining senders.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.names.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Snapshot of every registered sender in registration order.
    pub fn list(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
