//! TCP connection handler
//!
//! Handles one client connection: the name handshake, the receive loop, and
//! the dedicated writer task draining this session's outbound queue.
//!
//! Framing is deliberately naive: one read is treated as one logical unit,
//! with no delimiter or length prefix in either direction.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::command::ClientCommand;
use crate::error::AppError;
use crate::message::ServerMessage;
use crate::registry::RegistryCommand;
use crate::session::Session;
use crate::types::SessionId;

/// Handshake read buffer: the first unit is the display name
const NAME_BUFFER_SIZE: usize = 1024;

/// Main loop read buffer
const READ_BUFFER_SIZE: usize = 4096;

/// Outbound queue depth per session
const OUTBOUND_QUEUE_SIZE: usize = 32;

/// Handle a new TCP connection
///
/// Reads the handshake unit, registers the session, then relays inbound
/// units to the registry until the peer disconnects, the unit `/exit`s, or
/// the session's cancellation fires. The exit sequence deregisters exactly
/// once and waits for the writer to drain before returning.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<RegistryCommand>,
    cancel: CancellationToken,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    let (mut reader, mut writer) = stream.into_split();

    // Handshake: whatever the first read yields, decoded and trimmed, is the
    // display name. Empty and colliding names are accepted as-is.
    let mut name_buf = vec![0u8; NAME_BUFFER_SIZE];
    let read = tokio::select! {
        read = reader.read(&mut name_buf) => read?,
        _ = cancel.cancelled() => return Ok(()),
    };
    if read == 0 {
        debug!("{} closed before the handshake", peer_addr);
        return Ok(());
    }
    let name = String::from_utf8_lossy(&name_buf[..read]).trim().to_string();

    let session_id = SessionId::new();
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_QUEUE_SIZE);

    let session = Session::new(session_id, name, msg_tx, cancel.clone());
    if cmd_tx
        .send(RegistryCommand::Join { session })
        .await
        .is_err()
    {
        error!("Failed to register session {} - registry closed", session_id);
        return Err(AppError::ChannelSend);
    }

    // Writer task: drains the outbound queue in order. Ends when the
    // registry drops this session's sender, then closes the stream. A write
    // failure marks the connection dead so the receive loop unblocks too.
    let write_cancel = cancel.clone();
    let write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            if let Err(e) = writer.write_all(msg.to_string().as_bytes()).await {
                debug!("Write to session {} failed: {}", session_id, e);
                write_cancel.cancel();
                break;
            }
        }
        let _ = writer.shutdown().await;
        debug!("Write task ended for {}", session_id);
    });

    // Receive loop: a zero-length read or an I/O error is a disconnection,
    // never escalated beyond this session.
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let read = tokio::select! {
            read = reader.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    debug!("Read from session {} failed: {}", session_id, e);
                    break;
                }
            },
            _ = cancel.cancelled() => break,
        };

        let unit = String::from_utf8_lossy(&buf[..read]).trim().to_string();
        if cmd_tx.send(unit_to_command(session_id, &unit)).await.is_err() {
            debug!("Registry closed, ending receive loop for {}", session_id);
            break;
        }
    }

    // Exit sequence, for any loop exit: signal the session's cancellation,
    // deregister (the registry announces the departure), let the writer
    // drain and close the stream.
    cancel.cancel();
    let _ = cmd_tx.send(RegistryCommand::Leave { session_id }).await;
    let _ = write_task.await;

    debug!("Session {} handler finished", session_id);
    Ok(())
}

/// Convert one inbound unit to a registry command
fn unit_to_command(session_id: SessionId, unit: &str) -> RegistryCommand {
    match ClientCommand::parse(unit) {
        ClientCommand::Chat(text) => RegistryCommand::Chat { session_id, text },
        ClientCommand::List => RegistryCommand::List { session_id },
        ClientCommand::Whisper { target, text } => RegistryCommand::Whisper {
            session_id,
            target,
            text,
        },
        ClientCommand::Help => RegistryCommand::Help { session_id },
        ClientCommand::Exit => RegistryCommand::Exit { session_id },
        ClientCommand::Malformed { usage } => RegistryCommand::Malformed { session_id, usage },
        ClientCommand::Unknown(verb) => RegistryCommand::Unknown { session_id, verb },
    }
}
