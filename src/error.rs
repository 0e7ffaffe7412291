//! Error types for the relay server
//!
//! Defines fatal application-level errors and per-delivery send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Fatal conditions only: transport failures on a connection's own stream
/// and broken internal channels. Protocol misuse (bad commands, missing
/// arguments, unknown whisper targets) is never an error at this level; it
/// is answered with a text notice to the issuing session.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal for the affected connection or, at bind time, the process)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (fatal - the registry actor is gone)
    #[error("Channel send error")]
    ChannelSend,
}

/// Message delivery errors
///
/// Occurs when enqueueing a message onto a session's outbound queue fails.
/// Each failure affects only that one recipient.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the queue has been closed (writer task is gone)
    #[error("Outbound queue closed")]
    Closed,

    /// The queue is full (recipient is stalled); the message was dropped
    #[error("Outbound queue full")]
    Backlogged,
}
