//! Ephemeral Text-Relay Server Library
//!
//! A multi-client chat relay over raw TCP. Clients register a display name
//! with their first read and exchange broadcast and whisper messages through
//! a central process that holds no history.
//!
//! # Features
//! - Name handshake on the first inbound read (no validation, no uniqueness)
//! - Public chat relayed to everyone but the author
//! - `/whisper` private messages, `/list`, `/help`, `/exit`
//! - Operator console with `/list`, `/sysmsg`, `/exit`, `/shutdown`
//! - Coordinated shutdown that disconnects every session
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Registry` is the central actor owning all session state
//! - Each connection has a handler task relaying units to the registry and a
//!   writer task draining its bounded outbound queue (per-recipient ordering)
//! - Cancellation scopes nest: one global token, one child per connection
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//! use text_relay::{acceptor, Registry};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(Registry::new(cmd_rx).run());
//!
//!     let shutdown = CancellationToken::new();
//!     acceptor::run(listener, cmd_tx, shutdown).await;
//! }
//! ```

pub mod acceptor;
pub mod command;
pub mod connection;
pub mod console;
pub mod error;
pub mod message;
pub mod registry;
pub mod session;
pub mod shutdown;
pub mod types;

// Re-export main types for convenience
pub use command::{AdminCommand, ClientCommand};
pub use connection::handle_connection;
pub use error::{AppError, SendError};
pub use message::ServerMessage;
pub use registry::{Registry, RegistryCommand};
pub use session::Session;
pub use types::SessionId;
