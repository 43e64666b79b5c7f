use std::{net::SocketAddr, time::Duration};

use anyhow::{bail, Result};
use message_center::server::Server;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpListener, TcpStream,
    },
    sync::oneshot,
    task::JoinHandle,
    time::timeout,
};

const READ_TIMEOUT: Duration = Duration::from_secs(2);

struct Connection {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    pending: String,
}

impl Connection {
    async fn open(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader,
            writer,
            pending: String::new(),
        })
    }

    async fn send_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Reads until `needle` shows up and returns everything up to and
    /// including it. Text after the needle is kept for the next call.
    async fn read_until(&mut self, needle: &str) -> Result<String> {
        let mut buffer = [0u8; 1024];
        loop {
            if let Some(index) = self.pending.find(needle) {
                let rest = self.pending.split_off(index + needle.len());
                return Ok(std::mem::replace(&mut self.pending, rest));
            }
            let read = timeout(READ_TIMEOUT, self.reader.read(&mut buffer)).await??;
            if read == 0 {
                bail!(
                    "connection closed while waiting for {needle:?}; got {:?}",
                    self.pending
                );
            }
            self.pending.push_str(std::str::from_utf8(&buffer[..read])?);
        }
    }

    async fn expect_closed(&mut self) -> Result<()> {
        let mut buffer = [0u8; 64];
        let read = timeout(READ_TIMEOUT, self.reader.read(&mut buffer)).await??;
        if read != 0 {
            bail!("expected close, got {:?}", &buffer[..read]);
        }
        Ok(())
    }
}

async fn start_server() -> Result<(
    SocketAddr,
    message_center::SenderHandle,
    oneshot::Sender<()>,
    JoinHandle<()>,
)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = Server::new(listener);
    let sender = server.attach_sender("A");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let shutdown = async move {
            let _ = shutdown_rx.await;
        };
        let _ = server.run_until(shutdown).await;
    });

    Ok((addr, sender, shutdown_tx, task))
}

#[tokio::test]
async fn spying_console_receives_published_messages() -> Result<()> {
    let (addr, mut sender, shutdown_tx, server) = start_server().await?;

    let mut console = Connection::open(addr).await?;
    let greeting = console.read_until(":> ").await?;
    assert!(greeting.starts_with("\n\nMessage Center "));

    console.send_line("list").await?;
    let listing = console.read_until(":> ").await?;
    assert!(listing.starts_with("\n   - A\n\n"));

    console.send_line("spy A").await?;
    // `ping` is answered after `spy` has been applied, so the subscription is live.
    console.send_line("ping").await?;
    assert_eq!(console.read_until("pong").await?, "pong");

    assert_eq!(sender.publish_line("temp=5"), 1);
    assert_eq!(console.read_until("temp=5").await?, "\nA: temp=5");

    console.send_line("@A calibrate now").await?;
    let command = timeout(READ_TIMEOUT, sender.next_command()).await?;
    assert_eq!(command.as_deref(), Some("calibrate now"));

    console.send_line("").await?;
    let help = console.read_until(":> ").await?;
    assert!(help.starts_with("\n Command Help:"));

    let _ = shutdown_tx.send(());
    let _ = server.await;
    Ok(())
}

#[tokio::test]
async fn exit_closes_the_connection() -> Result<()> {
    let (addr, sender, shutdown_tx, server) = start_server().await?;

    let mut console = Connection::open(addr).await?;
    console.read_until(":> ").await?;
    console.send_line("spy A").await?;
    console.send_line("EXIT").await?;
    assert_eq!(console.read_until("exit").await?, "exit");
    console.expect_closed().await?;

    // The session is gone once the connection closes.
    let mut reached = sender.publish("after exit");
    for _ in 0..50 {
        if reached == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        reached = sender.publish("after exit");
    }
    assert_eq!(reached, 0);

    let _ = shutdown_tx.send(());
    let _ = server.await;
    Ok(())
}

#[tokio::test]
async fn sessions_get_distinct_prompts() -> Result<()> {
    let (addr, _sender, shutdown_tx, server) = start_server().await?;

    let mut first = Connection::open(addr).await?;
    let first_greeting = first.read_until(":> ").await?;
    let mut second = Connection::open(addr).await?;
    let second_greeting = second.read_until(":> ").await?;

    assert_ne!(first_greeting, second_greeting);

    first.send_line("hello there").await?;
    assert_eq!(first.read_until("hello").await?, "hello");

    let _ = shutdown_tx.send(());
    let _ = server.await;
    Ok(())
}
