//! fifo-relay server binary
//!
//! Run with: cargo run -- --dir /tmp/chat
//!
//! Clients register by writing their name to `<dir>/registration_fifo`, then
//! read from `<dir>/server_to_<name>` and write to `<dir>/<name>_to_server`.
//! A client that reconnects under the same name reuses its FIFOs.
//! See `demos/chat_client.rs` for a client.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use fifo_relay::{RelayConfig, RelayServer};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fifo-relay")]
#[command(about = "Broadcast relay over named FIFOs")]
struct Args {
    /// Directory for the rendezvous and client FIFOs
    #[arg(short, long, default_value = "/tmp/fifo-relay")]
    dir: PathBuf,

    /// Rendezvous FIFO name inside the directory
    #[arg(short, long, default_value = "registration_fifo")]
    rendezvous: String,

    /// Maximum concurrently connected clients (0 = unlimited)
    #[arg(short, long, default_value = "0")]
    max_clients: usize,

    /// Multiplexer wait timeout in milliseconds
    #[arg(long, default_value = "1000")]
    poll_timeout_ms: u64,

    /// How long a registering client has to open its read end, in milliseconds
    #[arg(long, default_value = "2000")]
    open_timeout_ms: u64,

    /// Enable debug logging (includes relayed payloads)
    #[arg(long)]
    debug: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("fifo_relay={}", level).parse()?),
        )
        .init();

    std::fs::create_dir_all(&args.dir)?;

    let config = RelayConfig::with_dir(&args.dir)
        .rendezvous_name(args.rendezvous)
        .max_clients(args.max_clients)
        .poll_timeout(Duration::from_millis(args.poll_timeout_ms))
        .writer_open_timeout(Duration::from_millis(args.open_timeout_ms));

    let mut server = RelayServer::new(config);
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
