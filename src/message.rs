//! Message protocol definitions
//!
//! The wire format is plain text: every server-to-client message is one
//! prefix-tagged unit the client classifies by its leading bracket tag.
//! `ServerMessage` keeps one variant per wire shape and renders through
//! `Display`. No delimiter or length prefix is appended; each message is
//! written as a single unit, mirroring the one-read-one-unit assumption on
//! the inbound side.

/// Server → Client message
///
/// One variant per outbound wire shape. Messages are transient: a value is
/// built, enqueued on the recipient's outbound queue, written once, and gone.
#[derive(Debug, Clone)]
pub enum ServerMessage {
    /// Private server response to the receiving session: `[SERVER] ...`
    Server(String),
    /// Operator announcement to everyone: `[SERVER ANNOUNCEMENT] ...`
    Announcement(String),
    /// Public chat authored by another session: `[<name>]: <text>`
    Chat { from: String, text: String },
    /// Private message received: `[WHISPER from <name>]: <text>`
    WhisperFrom { from: String, text: String },
    /// Confirmation echo to the whisper's author: `[WHISPER to <name>]: <text>`
    WhisperTo { to: String, text: String },
    /// Unprefixed system notice (join/leave)
    Notice(String),
}

impl std::fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerMessage::Server(text) => write!(f, "[SERVER] {text}"),
            ServerMessage::Announcement(text) => write!(f, "[SERVER ANNOUNCEMENT] {text}"),
            ServerMessage::Chat { from, text } => write!(f, "[{from}]: {text}"),
            ServerMessage::WhisperFrom { from, text } => {
                write!(f, "[WHISPER from {from}]: {text}")
            }
            ServerMessage::WhisperTo { to, text } => write!(f, "[WHISPER to {to}]: {text}"),
            ServerMessage::Notice(text) => write!(f, "{text}"),
        }
    }
}
