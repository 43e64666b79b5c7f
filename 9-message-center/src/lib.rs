//! Message center: named senders publish text, connected sessions spy on one
//! sender at a time or send it commands.
//!
//! The routing core is transport agnostic. Each module focuses on one
//! responsibility:
//!
//! - [`sender`] and [`session`] hold the two registries.
//! - [`command`] parses the line-based command language.
//! - [`dispatcher`] applies a parsed line to a session's state.
//! - [`router`] fans published messages out to spying sessions.
//! - [`center`] owns both registries behind a single lock and emits
//!   [`outbound`] effects while holding it.
//! - [`switchboard`] routes those effects to connections and to in-process
//!   sender handles.
//! - [`server`] hosts a center over TCP, one session per connection.
//! - [`console`], [`heartbeat`] and [`cli`] make up the binary.
//!
//! Integration tests drive the center directly and through a live server.

pub mod center;
pub mod cli;
pub mod command;
pub mod console;
pub mod dispatcher;
pub mod heartbeat;
pub mod outbound;
pub mod router;
pub mod sender;
pub mod server;
pub mod session;
pub mod switchboard;

pub use center::MessageCenter;
pub use outbound::{Outbound, OutboundSink};
pub use session::{Session, SessionId, SessionMode};
pub use switchboard::{SenderHandle, Switchboard};
