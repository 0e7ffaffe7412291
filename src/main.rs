//! Text Relay Server - Entry Point
//!
//! Binds the TCP listener, starts the registry actor and the admin console,
//! and runs the accept loop until either the console or the acceptor
//! finishes, then coordinates the shutdown.

use std::net::SocketAddr;

use clap::Parser;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use text_relay::{acceptor, console, shutdown, Registry};

/// Channel buffer size for registry commands
const CHANNEL_BUFFER_SIZE: usize = 256;

/// Ephemeral text-relay chat server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address and port to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=text_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("text_relay=info")),
        )
        .init();

    let args = Args::parse();

    // Startup configuration errors are fatal: report and do not proceed
    let listener = match TcpListener::bind(args.addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", args.addr, e);
            return Err(e.into());
        }
    };
    info!("Text relay server listening on {}", args.addr);

    // Registry actor channel and task
    let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    let registry_task = tokio::spawn(Registry::new(cmd_rx).run());

    let global_cancel = CancellationToken::new();

    // Operator console on the server's own stdin
    let console_task = tokio::spawn(console::run(
        BufReader::new(tokio::io::stdin()),
        cmd_tx.clone(),
        global_cancel.clone(),
    ));

    // The console and the acceptor race; whichever finishes first starts
    // the teardown. Ctrl-C joins the race as a third terminal condition.
    tokio::select! {
        _ = acceptor::run(listener, cmd_tx.clone(), global_cancel.clone()) => {}
        _ = console_task => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C");
        }
    }

    shutdown::coordinate(&global_cancel, &cmd_tx).await;

    // Dropping the last local sender lets the registry drain the remaining
    // handler commands and stop once every handler has unwound.
    drop(cmd_tx);
    let _ = registry_task.await;

    info!("Server stopped");
    Ok(())
}
