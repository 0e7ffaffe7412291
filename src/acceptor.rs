//! Connection acceptor
//!
//! Accepts connections on the bound listener and spawns one handler task per
//! connection, each with a cancellation scope nested under the global
//! shutdown token.

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::connection::handle_connection;
use crate::registry::RegistryCommand;

/// Accept connections until the shutdown token fires
///
/// Cancellation unblocks an accept already in flight. An error on an
/// individual accept is logged and the loop continues; only cancellation
/// ends it.
pub async fn run(
    listener: TcpListener,
    cmd_tx: mpsc::Sender<RegistryCommand>,
    shutdown: CancellationToken,
) {
    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = shutdown.cancelled() => break,
        };

        match accepted {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let cmd_tx = cmd_tx.clone();
                let cancel = shutdown.child_token();

                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, cmd_tx, cancel).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }

    info!("Acceptor stopped");
}
