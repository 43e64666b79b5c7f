//! TCP line transport hosting a [`MessageCenter`].
//!
//! Every accepted connection becomes one session. A reader loop feeds each
//! received line to the center, and a single writer task per connection
//! writes whatever the center delivers to that session, raw and in order.

use std::{
    future::Future,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use anyhow::Result;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    select,
    sync::mpsc,
};
use tracing::{debug, info, warn};

use crate::{
    center::MessageCenter,
    command::EXIT_REPLY,
    session::SessionId,
    switchboard::{SenderHandle, Switchboard},
};

const LINE_ENDINGS: &[char] = &['\n', '\r'];
/// Longest input line accepted from a connection, terminator included.
const MAX_LINE_BYTES: u64 = 8 * 1024;

pub type SharedCenter = Arc<MessageCenter<Switchboard>>;

pub struct Server {
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl Server {
    pub fn new(listener: TcpListener) -> Self {
        Self {
            listener,
            state: Arc::new(ServerState::new()),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn center(&self) -> SharedCenter {
        Arc::clone(&self.state.center)
    }

    /// Registers an in-process sender on this server's center.
    pub fn attach_sender(&self, name: &str) -> SenderHandle {
        SenderHandle::attach(self.center(), name)
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Server { listener, state } = self;
        tokio::pin!(shutdown);

        loop {
            select! {
                _ = &mut shutdown => {
                    info!("message center shutting down");
                    break;
                }
                accept_result = listener.accept() => {
                    handle_accept_result(accept_result, &state);
                }
            }
        }

        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}

struct ServerState {
    center: SharedCenter,
    next_id: AtomicU64,
}

impl ServerState {
    fn new() -> Self {
        Self {
            center: Arc::new(MessageCenter::new(Switchboard::new())),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> SessionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

fn handle_accept_result(
    result: std::io::Result<(TcpStream, SocketAddr)>,
    state: &Arc<ServerState>,
) {
    match result {
        Ok((stream, peer)) => spawn_connection_handler(stream, peer, state),
        Err(err) => warn!(error = ?err, "failed to accept connection"),
    }
}

fn spawn_connection_handler(stream: TcpStream, peer: SocketAddr, state: &Arc<ServerState>) {
    let state = Arc::clone(state);
    tokio::spawn(async move {
        if let Err(err) = handle_connection(stream, peer, state).await {
            warn!(peer = %peer, error = ?err, "connection closed with error");
        }
    });
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    state: Arc<ServerState>,
) -> Result<()> {
    let id = state.next_id();
    let center = &state.center;
    let (reader, writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
    center.sink().attach_connection(id, outbox_tx);
    let mut writer_task = tokio::spawn(write_outbox(writer, outbox_rx));

    info!(%peer, session = id, "client connected");
    center.connect(id);

    // The writer finishes on its own after sending the exit reply.
    let (result, writer_done) = select! {
        result = read_lines(&mut reader, center, id) => (result, false),
        joined = &mut writer_task => (flatten_join(joined), true),
    };

    center.disconnect(id);
    center.sink().detach_connection(id);
    if !writer_done {
        if let Err(err) = flatten_join(writer_task.await) {
            debug!(session = id, error = ?err, "writer stopped with error");
        }
    }

    info!(%peer, session = id, "client disconnected");
    result
}

fn flatten_join(joined: Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    joined?
}

async fn read_lines<R>(
    reader: &mut R,
    center: &MessageCenter<Switchboard>,
    id: SessionId,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        line.clear();
        let bytes = (&mut *reader)
            .take(MAX_LINE_BYTES)
            .read_until(b'\n', &mut line)
            .await?;
        if bytes == 0 {
            return Ok(());
        }
        if !line.ends_with(b"\n") && bytes as u64 == MAX_LINE_BYTES {
            warn!(session = id, limit = MAX_LINE_BYTES, "dropping over-long line");
            skip_line(reader).await?;
            continue;
        }
        // Invalid UTF-8 only degrades this line.
        let text = String::from_utf8_lossy(&line);
        // Blank lines are meaningful: they return the session to console mode.
        center.handle_line(id, text.trim_end_matches(LINE_ENDINGS));
    }
}

/// Discards input up to and including the next newline.
async fn skip_line<R>(reader: &mut R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            return Ok(());
        }
        let (used, done) = match buf.iter().position(|&byte| byte == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (buf.len(), false),
        };
        reader.consume(used);
        if done {
            return Ok(());
        }
    }
}

async fn write_outbox<W>(
    mut writer: W,
    mut outbox: mpsc::UnboundedReceiver<String>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(text) = outbox.recv().await {
        writer.write_all(text.as_bytes()).await?;
        writer.flush().await?;
        if text == EXIT_REPLY {
            break;
        }
    }
    writer.shutdown().await?;
    Ok(())
}
