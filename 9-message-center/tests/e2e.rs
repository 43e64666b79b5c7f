use std::{process::Stdio, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    process::{Child, ChildStdout, Command},
    time::timeout,
};

const READ_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn heartbeat_server_end_to_end() -> Result<()> {
    let binary = assert_cmd::cargo::cargo_bin!("message-center");

    let mut cmd = Command::new(binary);
    cmd.arg("server")
        .arg("--listen")
        .arg("127.0.0.1:0")
        .arg("--heartbeat-ms")
        .arg("50")
        .env("RUST_LOG", "info")
        .env("NO_COLOR", "1")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    let mut server = cmd.spawn().context("failed to spawn server")?;
    let stdout = server
        .stdout
        .take()
        .context("server stdout missing after spawn")?;
    let mut stdout = BufReader::new(stdout);
    let addr = read_server_addr(&mut stdout).await?;

    // Drain remaining logs so the pipe never fills.
    let log_task = tokio::spawn(drain_stdout(stdout));

    let mut stream = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {addr}"))?;
    let mut seen = String::new();

    read_until(&mut stream, &mut seen, ":> ").await?;
    stream.write_all(b"list\n").await?;
    read_until(&mut stream, &mut seen, "   - heartbeat\n").await?;

    stream.write_all(b"spy heartbeat\n").await?;
    read_until(&mut stream, &mut seen, "heartbeat: tick ").await?;

    stream.write_all(b"@heartbeat reset\n").await?;
    read_until(&mut stream, &mut seen, "heartbeat: counter reset").await?;

    stream.write_all(b"exit\n").await?;
    read_until(&mut stream, &mut seen, "exit").await?;

    shutdown(&mut server).await;
    let _ = log_task.await;
    Ok(())
}

async fn read_server_addr(reader: &mut BufReader<ChildStdout>) -> Result<String> {
    let mut line = String::new();
    let bytes = timeout(READ_TIMEOUT, reader.read_line(&mut line)).await??;
    if bytes == 0 {
        bail!("server did not emit listening address");
    }
    let trimmed = line.trim();
    let addr = trimmed
        .split_whitespace()
        .last()
        .context("unexpected server banner format")?;
    if !addr.contains(':') {
        return Err(anyhow!("server banner missing socket: {trimmed}"));
    }
    Ok(addr.to_string())
}

/// Reads from `stream` into `seen` until `needle` appears, then discards the
/// text up to and including it.
async fn read_until(stream: &mut TcpStream, seen: &mut String, needle: &str) -> Result<()> {
    let mut buffer = [0u8; 1024];
    loop {
        if let Some(index) = seen.find(needle) {
            seen.drain(..index + needle.len());
            return Ok(());
        }
        let read = timeout(READ_TIMEOUT, stream.read(&mut buffer))
            .await
            .with_context(|| format!("timed out waiting for {needle:?}"))??;
        if read == 0 {
            bail!("connection closed while waiting for {needle:?}");
        }
        seen.push_str(&String::from_utf8_lossy(&buffer[..read]));
    }
}

async fn drain_stdout(mut reader: BufReader<ChildStdout>) {
    let mut buffer = String::new();
    while matches!(reader.read_line(&mut buffer).await, Ok(bytes) if bytes > 0) {
        buffer.clear();
    }
}

async fn shutdown(child: &mut Child) {
    let _ = child.kill().await;
    let _ = child.wait().await;
}
