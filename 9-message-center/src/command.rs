//! Parsing of the line-based command language spoken by sessions.
//!
//! A line is split on whitespace. The first token, lower-cased, is the verb and
//! selects the command; sender names in the arguments keep their case because
//! the sender registry is case-sensitive.
//!
//! Parsing never fails. Anything that is not a known verb becomes
//! [`Command::Unknown`], and a blank line becomes [`Command::Console`].

/// Reply sent for `exit`. The transport closes the connection once it writes it.
pub const EXIT_REPLY: &str = "exit";

pub const PONG: &str = "pong";

pub const HELP: &str = concat!(
    " Command Help:\n\n",
    "   - list                    => get a list of message senders\n",
    "   - spy <sender id>         => receive messages only from the sender identified by sender id\n",
    "   - <cr> (carriage return)  => stop realtime message receiving and show help\n",
    "   - help                    => show this help\n",
    "   - exit                    => close connection to message center\n",
    "   - @<sender id> <command>  => send a string to a sender through the message center\n",
    "   - ping                    => message center replies pong\n",
    "   - <unknown command>       => return echo of command\n",
);

/// Commands a session can issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Blank line: leave spy mode and show help.
    Console,
    /// `spy [sender]`. A missing sender makes the command a no-op.
    Spy { sender: Option<String> },
    Exit,
    List,
    Ping,
    Help,
    /// `@sender rest...`: forward `command` to `sender` and start spying on it.
    Forward { sender: String, command: String },
    /// Any other verb, already lower-cased. Arguments are dropped.
    Unknown { verb: String },
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            return Command::Console;
        };

        // `@Sender` keeps the sender's original case; only the verb is folded.
        if let Some(sender) = first.strip_prefix('@') {
            return Command::Forward {
                sender: sender.to_string(),
                command: tokens.collect::<Vec<_>>().join(" "),
            };
        }

        let verb = first.to_lowercase();
        match verb.as_str() {
            "spy" => Command::Spy {
                sender: tokens.next().map(str::to_string),
            },
            "exit" => Command::Exit,
            "list" => Command::List,
            "ping" => Command::Ping,
            "help" => Command::Help,
            _ => Command::Unknown { verb },
        }
    }
}
