//! Session struct definition
//!
//! Represents one connected client on the server side: identity, outbound
//! message queue, and the cancellation scope of that connection.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::SessionId;

/// Connected session information
///
/// Held by the registry actor. The display name is adopted verbatim during
/// the handshake and never changes afterwards; it carries no uniqueness
/// constraint, so two sessions may share a name. The sender feeds the
/// connection's dedicated writer task, which gives each recipient in-order
/// delivery and bounded buffering.
#[derive(Debug)]
pub struct Session {
    /// Unique identifier for this connection
    pub id: SessionId,
    /// Display name taken from the handshake (may be empty, may collide)
    pub name: String,
    /// Server → Client outbound queue
    sender: mpsc::Sender<ServerMessage>,
    /// Cancellation scope for this connection only
    cancel: CancellationToken,
}

impl Session {
    /// Create a new session handle
    pub fn new(
        id: SessionId,
        name: String,
        sender: mpsc::Sender<ServerMessage>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            name,
            sender,
            cancel,
        }
    }

    /// Enqueue a message for this session without waiting
    ///
    /// Never blocks the caller. A closed queue means the connection's writer
    /// is gone; a full queue means the recipient is stalled and this one
    /// message is dropped.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
            mpsc::error::TrySendError::Full(_) => SendError::Backlogged,
        })
    }

    /// Case-insensitive display-name match (whisper targeting)
    pub fn is_named(&self, target: &str) -> bool {
        self.name.to_lowercase() == target.to_lowercase()
    }

    /// Signal this connection's cancellation, ending its receive loop
    pub fn disconnect(&self) {
        self.cancel.cancel();
    }
}
