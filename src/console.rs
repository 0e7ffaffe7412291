//! Admin console loop
//!
//! Operator commands read from the server's own input stream, independently
//! of any client connection. Races the acceptor: whichever loop finishes
//! first starts the teardown.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::command::AdminCommand;
use crate::registry::RegistryCommand;

/// Run the operator console until shutdown
///
/// `/exit` and `/shutdown` signal the global token and end the loop. EOF on
/// the input ends the loop too; the caller treats console completion as a
/// shutdown trigger.
pub async fn run<R>(input: R, cmd_tx: mpsc::Sender<RegistryCommand>, shutdown: CancellationToken)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = shutdown.cancelled() => break,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("Console input closed");
                break;
            }
            Err(e) => {
                debug!("Console read failed: {}", e);
                break;
            }
        };

        let Some(cmd) = AdminCommand::parse(line.trim()) else {
            continue;
        };

        match cmd {
            AdminCommand::List => {
                let (reply_tx, reply_rx) = oneshot::channel();
                if cmd_tx
                    .send(RegistryCommand::Names { reply: reply_tx })
                    .await
                    .is_err()
                {
                    break;
                }
                if let Ok(names) = reply_rx.await {
                    println!("Connected users ({}): {}", names.len(), names.join(", "));
                }
            }
            AdminCommand::Sysmsg(text) => {
                if cmd_tx.send(RegistryCommand::Announce { text }).await.is_err() {
                    break;
                }
            }
            AdminCommand::Shutdown => {
                shutdown.cancel();
                break;
            }
            AdminCommand::Malformed { usage } => {
                println!("{usage}");
            }
            AdminCommand::Unknown(word) => {
                println!(
                    "Unknown command '{word}'. Available: /list, /sysmsg <message>, /exit, /shutdown"
                );
            }
        }
    }

    debug!("Console loop ended");
}
