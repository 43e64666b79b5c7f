use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use message_center::{
    cli::{Cli, Command, ServerArgs},
    console, heartbeat,
    server::Server,
};

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Server(args) => serve(args).await?,
        Command::Console(args) => console::run(args).await?,
    }

    Ok(())
}

async fn serve(args: ServerArgs) -> Result<()> {
    let listener = TcpListener::bind(args.listen).await?;
    let server = Server::new(listener);
    let addr = server.local_addr()?;
    info!("message center listening on {}", addr);

    if let Some(millis) = args.heartbeat_ms {
        let handle = server.attach_sender(&args.heartbeat_name);
        tokio::spawn(heartbeat::run(handle, Duration::from_millis(millis.max(1))));
    }

    if let Err(err) = server.run_until_ctrl_c().await {
        warn!("message center exited with error: {err:?}");
        return Err(err);
    }
    Ok(())
}
