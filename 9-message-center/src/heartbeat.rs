//! Built-in sender that publishes a counter at a fixed interval.
//!
//! Useful for checking a running server from a console: `spy heartbeat`
//! shows the ticks and `@heartbeat reset` restarts the count.

use std::time::Duration;

use tokio::{select, time};
use tracing::{debug, info};

use crate::switchboard::SenderHandle;

pub async fn run(mut handle: SenderHandle, period: Duration) {
    let mut ticker = time::interval(period);
    let mut count: u64 = 0;
    info!(sender = handle.name(), ?period, "heartbeat started");

    loop {
        select! {
            _ = ticker.tick() => {
                count += 1;
                let reached = handle.publish_line(&format!("tick {count}"));
                debug!(count, reached, "heartbeat tick");
            }
            command = handle.next_command() => match command {
                Some(command) => respond(&handle, &mut count, &command),
                None => break,
            },
        }
    }

    info!(sender = handle.name(), "heartbeat stopped");
}

fn respond(handle: &SenderHandle, count: &mut u64, command: &str) {
    match command.trim() {
        "reset" => {
            *count = 0;
            handle.publish_line("counter reset");
        }
        other => {
            handle.publish_line(&format!("unknown command: {other}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use super::*;
    use crate::{center::MessageCenter, switchboard::Switchboard};

    #[tokio::test(start_paused = true)]
    async fn ticks_reach_spying_sessions_and_reset_restarts() {
        let center = Arc::new(MessageCenter::new(Switchboard::new()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        center.sink().attach_connection(1, tx);
        center.connect(1);
        let _greeting = rx.recv().await.expect("greeting");

        let handle = SenderHandle::attach(Arc::clone(&center), "heartbeat");
        center.handle_line(1, "spy heartbeat");
        let task = tokio::spawn(run(handle, Duration::from_secs(1)));

        assert_eq!(rx.recv().await.as_deref(), Some("\nheartbeat: tick 1"));
        assert_eq!(rx.recv().await.as_deref(), Some("\nheartbeat: tick 2"));

        center.handle_line(1, "@heartbeat reset");
        assert_eq!(rx.recv().await.as_deref(), Some("\nheartbeat: counter reset"));
        assert_eq!(rx.recv().await.as_deref(), Some("\nheartbeat: tick 1"));

        center.handle_line(1, "@heartbeat jump");
        assert_eq!(
            rx.recv().await.as_deref(),
            Some("\nheartbeat: unknown command: jump")
        );

        task.abort();
    }
}
