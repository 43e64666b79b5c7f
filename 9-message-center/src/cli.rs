use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the message center, accepting console sessions over TCP.
    Server(ServerArgs),
    /// Connect to a running message center from this terminal.
    Console(ConsoleArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Socket address the server should bind to. Use port 0 for an ephemeral port.
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub listen: SocketAddr,

    /// Run a built-in sender that publishes a tick every N milliseconds.
    #[arg(long, value_name = "MILLIS")]
    pub heartbeat_ms: Option<u64>,

    /// Sender name used by the built-in heartbeat.
    #[arg(long, default_value = "heartbeat")]
    pub heartbeat_name: String,
}

#[derive(Args, Debug, Clone)]
pub struct ConsoleArgs {
    /// Address of the message center to connect to.
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub server: SocketAddr,
}
