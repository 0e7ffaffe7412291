//! Shutdown coordination
//!
//! One teardown path shared by every terminal condition: console shutdown,
//! console EOF, Ctrl-C, acceptor cancellation.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::registry::RegistryCommand;

/// Tear the server down
///
/// Tells the registry to disconnect every session and clear itself, then
/// cancels the global scope so the acceptor stops. The registry command goes
/// first: handlers only deregister after a cancellation they can observe,
/// so `Shutdown` reaches the registry ahead of any `Leave` and the final
/// announcement is still delivered to every outbound queue.
///
/// Safe to invoke more than once: the token cancel is sticky and the
/// registry's shutdown is a no-op on an empty map.
pub async fn coordinate(shutdown: &CancellationToken, cmd_tx: &mpsc::Sender<RegistryCommand>) {
    info!("Shutdown signaled");
    let _ = cmd_tx.send(RegistryCommand::Shutdown).await;
    shutdown.cancel();
}
