//! Registry actor implementation
//!
//! The central actor that owns all shared state: the map of live sessions
//! and their join order. Uses the Actor pattern with mpsc channels for
//! message passing; connection handlers, the acceptor, and the admin console
//! only ever talk to the registry through `RegistryCommand`. No state is
//! touched across an I/O wait because delivery is a non-blocking enqueue
//! onto each recipient's outbound queue.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::session::Session;
use crate::types::SessionId;

/// Static response to `/help`
const HELP_TEXT: &str = "Available commands:\n  \
    /list - show connected users\n  \
    /whisper <user> <message> - send a private message\n  \
    /help - show this help\n  \
    /exit - leave the chat";

/// Commands sent from handlers and the admin console to the registry actor
#[derive(Debug)]
pub enum RegistryCommand {
    /// New session completed its handshake
    Join { session: Session },
    /// A session's receive loop ended; remove it and announce the departure
    Leave { session_id: SessionId },
    /// Public chat text, relayed to everyone but the author
    Chat { session_id: SessionId, text: String },
    /// Private message to the first session matching `target`
    Whisper {
        session_id: SessionId,
        target: String,
        text: String,
    },
    /// Private list of connected display names
    List { session_id: SessionId },
    /// Static command list
    Help { session_id: SessionId },
    /// Graceful exit requested by the session itself
    Exit { session_id: SessionId },
    /// Unit with an unrecognized verb
    Unknown { session_id: SessionId, verb: String },
    /// Unit with missing or incomplete arguments
    Malformed {
        session_id: SessionId,
        usage: &'static str,
    },
    /// Operator announcement, delivered to every session
    Announce { text: String },
    /// Names snapshot for the operator console
    Names { reply: oneshot::Sender<Vec<String>> },
    /// Disconnect every session and clear the registry
    Shutdown,
}

/// The registry actor
///
/// Holds every live session from handshake completion until its removal is
/// processed, exactly once. An explicit join-order list keeps name snapshots
/// and whisper first-match resolution deterministic.
pub struct Registry {
    /// All connected sessions: SessionId -> Session
    sessions: HashMap<SessionId, Session>,
    /// Session ids in join order
    order: Vec<SessionId>,
    /// Command receiver channel
    receiver: mpsc::Receiver<RegistryCommand>,
}

impl Registry {
    /// Create a new registry with the given command receiver
    pub fn new(receiver: mpsc::Receiver<RegistryCommand>) -> Self {
        Self {
            sessions: HashMap::new(),
            order: Vec::new(),
            receiver,
        }
    }

    /// Run the registry event loop
    ///
    /// Continuously receives and processes commands until all senders are
    /// dropped.
    pub async fn run(mut self) {
        info!("Registry started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("Registry shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Join { session } => self.handle_join(session),
            RegistryCommand::Leave { session_id } => self.handle_leave(session_id),
            RegistryCommand::Chat { session_id, text } => self.handle_chat(session_id, text),
            RegistryCommand::Whisper {
                session_id,
                target,
                text,
            } => self.handle_whisper(session_id, target, text),
            RegistryCommand::List { session_id } => self.handle_list(session_id),
            RegistryCommand::Help { session_id } => self.handle_help(session_id),
            RegistryCommand::Exit { session_id } => self.handle_exit(session_id),
            RegistryCommand::Unknown { session_id, verb } => self.handle_unknown(session_id, verb),
            RegistryCommand::Malformed { session_id, usage } => {
                self.send_to(session_id, ServerMessage::Server(usage.to_string()));
            }
            RegistryCommand::Announce { text } => {
                self.broadcast_to_all(ServerMessage::Announcement(text));
            }
            RegistryCommand::Names { reply } => {
                let _ = reply.send(self.names());
            }
            RegistryCommand::Shutdown => self.handle_shutdown(),
        }
    }

    /// Handle a session that completed its handshake
    fn handle_join(&mut self, session: Session) {
        info!("Session {} connected as '{}'", session.id, session.name);

        let welcome = ServerMessage::Server(format!("Welcome to the chat, {}!", session.name));
        self.deliver(&session, welcome);

        let notice = ServerMessage::Notice(format!("{} joined the chat.", session.name));
        let id = session.id;
        self.sessions.insert(id, session);
        self.order.push(id);

        self.broadcast_to_all(notice);
        debug!("Total sessions: {}", self.sessions.len());
    }

    /// Handle a session whose receive loop ended
    ///
    /// A second leave for the same id is a no-op, so shutdown teardown and a
    /// handler's own exit sequence never produce a duplicate departure.
    fn handle_leave(&mut self, session_id: SessionId) {
        let Some(session) = self.sessions.remove(&session_id) else {
            return;
        };
        self.order.retain(|id| *id != session_id);

        info!("Session {} ('{}') disconnected", session.id, session.name);

        let notice = ServerMessage::Notice(format!("{} left the chat.", session.name));
        self.broadcast_to_all(notice);
        debug!("Total sessions: {}", self.sessions.len());
    }

    /// Handle public chat: relay to everyone except the author
    fn handle_chat(&mut self, session_id: SessionId, text: String) {
        let Some(session) = self.sessions.get(&session_id) else {
            return;
        };

        let msg = ServerMessage::Chat {
            from: session.name.clone(),
            text,
        };
        self.broadcast_to_others(session_id, msg);
    }

    /// Handle a whisper request
    fn handle_whisper(&mut self, session_id: SessionId, target: String, text: String) {
        let Some(issuer) = self.sessions.get(&session_id) else {
            return;
        };

        if issuer.is_named(&target) {
            self.send_to(
                session_id,
                ServerMessage::Server("No need to whisper to yourself.".to_string()),
            );
            return;
        }

        // First match in join order; names are not unique, later holders of
        // the same name are never reached by whisper.
        let recipient = self
            .order
            .iter()
            .filter_map(|id| self.sessions.get(id))
            .find(|session| session.is_named(&target));

        let Some(recipient) = recipient else {
            self.send_to(
                session_id,
                ServerMessage::Server(format!("No user named '{target}' is connected.")),
            );
            return;
        };

        let recipient_name = recipient.name.clone();
        let from = issuer.name.clone();
        self.deliver(
            recipient,
            ServerMessage::WhisperFrom {
                from,
                text: text.clone(),
            },
        );
        self.send_to(
            session_id,
            ServerMessage::WhisperTo {
                to: recipient_name,
                text,
            },
        );
    }

    /// Handle `/list`: private snapshot of names in join order
    fn handle_list(&mut self, session_id: SessionId) {
        let names = self.names();
        let msg = ServerMessage::Server(format!(
            "Connected users ({}): {}",
            names.len(),
            names.join(", ")
        ));
        self.send_to(session_id, msg);
    }

    fn handle_help(&mut self, session_id: SessionId) {
        self.send_to(session_id, ServerMessage::Server(HELP_TEXT.to_string()));
    }

    /// Handle `/exit`: farewell, then signal the session's cancellation
    ///
    /// The receive loop observes the cancellation and runs the normal exit
    /// sequence, which sends the `Leave` that removes the session.
    fn handle_exit(&mut self, session_id: SessionId) {
        let Some(session) = self.sessions.get(&session_id) else {
            return;
        };

        self.deliver(session, ServerMessage::Server("Goodbye!".to_string()));
        session.disconnect();
    }

    fn handle_unknown(&mut self, session_id: SessionId, verb: String) {
        let msg = ServerMessage::Server(format!(
            "Unknown command '/{verb}'. Type /help for available commands."
        ));
        self.send_to(session_id, msg);
    }

    /// Disconnect every session and clear the registry
    ///
    /// Idempotent: a second shutdown finds nothing to disconnect. Late
    /// `Leave` commands from unwinding handlers hit the empty map and are
    /// ignored.
    fn handle_shutdown(&mut self) {
        if self.sessions.is_empty() {
            return;
        }

        info!("Shutting down, disconnecting {} sessions", self.sessions.len());
        self.broadcast_to_all(ServerMessage::Announcement(
            "Server is shutting down.".to_string(),
        ));

        for session in self.sessions.values() {
            session.disconnect();
        }
        self.sessions.clear();
        self.order.clear();
    }

    /// Snapshot of display names in join order
    fn names(&self) -> Vec<String> {
        self.order
            .iter()
            .filter_map(|id| self.sessions.get(id))
            .map(|session| session.name.clone())
            .collect()
    }

    /// Send to every session, no exclusion; echoed to the server console
    fn broadcast_to_all(&self, msg: ServerMessage) {
        info!("{msg}");
        for session in self.order.iter().filter_map(|id| self.sessions.get(id)) {
            self.deliver(session, msg.clone());
        }
    }

    /// Send to every session except the originating one
    fn broadcast_to_others(&self, exclude: SessionId, msg: ServerMessage) {
        for session in self
            .order
            .iter()
            .filter(|id| **id != exclude)
            .filter_map(|id| self.sessions.get(id))
        {
            self.deliver(session, msg.clone());
        }
    }

    /// Send to one session by id, if still registered
    fn send_to(&self, session_id: SessionId, msg: ServerMessage) {
        if let Some(session) = self.sessions.get(&session_id) {
            self.deliver(session, msg);
        }
    }

    /// Enqueue one message on one session's outbound queue
    ///
    /// A closed queue means the connection's writer is gone: that one
    /// session is disconnected. A full queue drops that one message. Either
    /// way the remaining recipients of a fan-out are unaffected.
    fn deliver(&self, session: &Session, msg: ServerMessage) {
        match session.send(msg) {
            Ok(()) => {}
            Err(SendError::Closed) => {
                debug!("Session {} queue closed, disconnecting", session.id);
                session.disconnect();
            }
            Err(SendError::Backlogged) => {
                warn!("Session {} ('{}') backlogged, message dropped", session.id, session.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn registry() -> Registry {
        let (_tx, rx) = mpsc::channel(1);
        Registry::new(rx)
    }

    fn join(
        registry: &mut Registry,
        name: &str,
    ) -> (
        SessionId,
        mpsc::Receiver<ServerMessage>,
        CancellationToken,
    ) {
        let id = SessionId::new();
        let (tx, rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let session = Session::new(id, name.to_string(), tx, cancel.clone());
        registry.handle_command(RegistryCommand::Join { session });
        (id, rx, cancel)
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg.to_string());
        }
        out
    }

    #[tokio::test]
    async fn test_join_welcomes_then_notifies() {
        let mut registry = registry();
        let (_alice, mut alice_rx, _) = join(&mut registry, "alice");

        let received = drain(&mut alice_rx);
        assert_eq!(
            received,
            vec![
                "[SERVER] Welcome to the chat, alice!",
                "alice joined the chat.",
            ]
        );

        let (_bob, mut bob_rx, _) = join(&mut registry, "bob");
        assert_eq!(drain(&mut alice_rx), vec!["bob joined the chat."]);
        assert_eq!(
            drain(&mut bob_rx),
            vec!["[SERVER] Welcome to the chat, bob!", "bob joined the chat."]
        );
    }

    #[tokio::test]
    async fn test_list_in_join_order() {
        let mut registry = registry();
        let (_alice, _rx_a, _) = join(&mut registry, "alice");
        let (bob, mut bob_rx, _) = join(&mut registry, "bob");
        let (_carol, _rx_c, _) = join(&mut registry, "carol");
        drain(&mut bob_rx);

        registry.handle_command(RegistryCommand::List { session_id: bob });

        assert_eq!(
            drain(&mut bob_rx),
            vec!["[SERVER] Connected users (3): alice, bob, carol"]
        );
    }

    #[tokio::test]
    async fn test_chat_excludes_sender() {
        let mut registry = registry();
        let (alice, mut alice_rx, _) = join(&mut registry, "alice");
        let (_bob, mut bob_rx, _) = join(&mut registry, "bob");
        let (_carol, mut carol_rx, _) = join(&mut registry, "carol");
        drain(&mut alice_rx);
        drain(&mut bob_rx);
        drain(&mut carol_rx);

        registry.handle_command(RegistryCommand::Chat {
            session_id: alice,
            text: "hi".to_string(),
        });

        assert!(drain(&mut alice_rx).is_empty());
        assert_eq!(drain(&mut bob_rx), vec!["[alice]: hi"]);
        assert_eq!(drain(&mut carol_rx), vec!["[alice]: hi"]);
    }

    #[tokio::test]
    async fn test_whisper_routes_and_echoes() {
        let mut registry = registry();
        let (carol, mut carol_rx, _) = join(&mut registry, "carol");
        let (_bob, mut bob_rx, _) = join(&mut registry, "Bob");
        drain(&mut carol_rx);
        drain(&mut bob_rx);

        registry.handle_command(RegistryCommand::Whisper {
            session_id: carol,
            target: "bob".to_string(),
            text: "secret".to_string(),
        });

        assert_eq!(drain(&mut bob_rx), vec!["[WHISPER from carol]: secret"]);
        assert_eq!(drain(&mut carol_rx), vec!["[WHISPER to Bob]: secret"]);
    }

    #[tokio::test]
    async fn test_whisper_duplicate_names_first_match_only() {
        let mut registry = registry();
        let (alice, mut alice_rx, _) = join(&mut registry, "alice");
        let (_dave1, mut dave1_rx, _) = join(&mut registry, "dave");
        let (_dave2, mut dave2_rx, _) = join(&mut registry, "dave");
        drain(&mut alice_rx);
        drain(&mut dave1_rx);
        drain(&mut dave2_rx);

        registry.handle_command(RegistryCommand::Whisper {
            session_id: alice,
            target: "DAVE".to_string(),
            text: "hello".to_string(),
        });

        assert_eq!(drain(&mut dave1_rx), vec!["[WHISPER from alice]: hello"]);
        assert!(drain(&mut dave2_rx).is_empty());
    }

    #[tokio::test]
    async fn test_whisper_target_not_found() {
        let mut registry = registry();
        let (alice, mut alice_rx, _) = join(&mut registry, "alice");
        drain(&mut alice_rx);

        registry.handle_command(RegistryCommand::Whisper {
            session_id: alice,
            target: "nobody".to_string(),
            text: "hello".to_string(),
        });

        assert_eq!(
            drain(&mut alice_rx),
            vec!["[SERVER] No user named 'nobody' is connected."]
        );
    }

    #[tokio::test]
    async fn test_whisper_to_self_is_refused() {
        let mut registry = registry();
        let (alice, mut alice_rx, _) = join(&mut registry, "Alice");
        drain(&mut alice_rx);

        registry.handle_command(RegistryCommand::Whisper {
            session_id: alice,
            target: "alice".to_string(),
            text: "hello".to_string(),
        });

        assert_eq!(
            drain(&mut alice_rx),
            vec!["[SERVER] No need to whisper to yourself."]
        );
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_responses() {
        let mut registry = registry();
        let (alice, mut alice_rx, _) = join(&mut registry, "alice");
        drain(&mut alice_rx);

        registry.handle_command(RegistryCommand::Unknown {
            session_id: alice,
            verb: "frobnicate".to_string(),
        });
        registry.handle_command(RegistryCommand::Malformed {
            session_id: alice,
            usage: crate::command::WHISPER_USAGE,
        });

        assert_eq!(
            drain(&mut alice_rx),
            vec![
                "[SERVER] Unknown command '/frobnicate'. Type /help for available commands.",
                "[SERVER] Usage: /whisper <user> <message>",
            ]
        );
    }

    #[tokio::test]
    async fn test_exit_sends_farewell_and_cancels() {
        let mut registry = registry();
        let (alice, mut alice_rx, cancel) = join(&mut registry, "alice");
        drain(&mut alice_rx);

        registry.handle_command(RegistryCommand::Exit { session_id: alice });

        assert_eq!(drain(&mut alice_rx), vec!["[SERVER] Goodbye!"]);
        assert!(cancel.is_cancelled());
        // Still registered until the receive loop's exit sequence leaves
        assert_eq!(registry.sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_leave_announces_exactly_once() {
        let mut registry = registry();
        let (_alice, mut alice_rx, _) = join(&mut registry, "alice");
        let (bob, mut bob_rx, _) = join(&mut registry, "bob");
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        registry.handle_command(RegistryCommand::Leave { session_id: bob });
        assert_eq!(drain(&mut alice_rx), vec!["bob left the chat."]);
        assert_eq!(registry.sessions.len(), 1);

        // Double-remove is a no-op
        registry.handle_command(RegistryCommand::Leave { session_id: bob });
        assert!(drain(&mut alice_rx).is_empty());
        assert_eq!(registry.sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_announce_reaches_everyone() {
        let mut registry = registry();
        let (_alice, mut alice_rx, _) = join(&mut registry, "alice");
        let (_bob, mut bob_rx, _) = join(&mut registry, "bob");
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        registry.handle_command(RegistryCommand::Announce {
            text: "maintenance at noon".to_string(),
        });

        let expected = vec!["[SERVER ANNOUNCEMENT] maintenance at noon"];
        assert_eq!(drain(&mut alice_rx), expected);
        assert_eq!(drain(&mut bob_rx), expected);
    }

    #[tokio::test]
    async fn test_names_snapshot() {
        let mut registry = registry();
        let (_alice, _rx_a, _) = join(&mut registry, "alice");
        let (_bob, _rx_b, _) = join(&mut registry, "bob");

        let (reply_tx, reply_rx) = oneshot::channel();
        registry.handle_command(RegistryCommand::Names { reply: reply_tx });

        assert_eq!(reply_rx.await.unwrap(), vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_shutdown_disconnects_all_and_clears() {
        let mut registry = registry();
        let (_alice, mut alice_rx, alice_cancel) = join(&mut registry, "alice");
        let (_bob, mut bob_rx, bob_cancel) = join(&mut registry, "bob");
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        registry.handle_command(RegistryCommand::Shutdown);

        assert_eq!(
            drain(&mut alice_rx),
            vec!["[SERVER ANNOUNCEMENT] Server is shutting down."]
        );
        assert_eq!(
            drain(&mut bob_rx),
            vec!["[SERVER ANNOUNCEMENT] Server is shutting down."]
        );
        assert!(alice_cancel.is_cancelled());
        assert!(bob_cancel.is_cancelled());
        assert!(registry.sessions.is_empty());
        assert!(registry.order.is_empty());

        // Idempotent
        registry.handle_command(RegistryCommand::Shutdown);
        assert!(registry.sessions.is_empty());
    }

    #[tokio::test]
    async fn test_dead_recipient_is_disconnected_without_aborting_fanout() {
        let mut registry = registry();
        let (alice, _alice_rx, _) = join(&mut registry, "alice");
        let (_bob, bob_rx, bob_cancel) = join(&mut registry, "bob");
        let (_carol, mut carol_rx, _) = join(&mut registry, "carol");
        drop(bob_rx);
        drain(&mut carol_rx);

        registry.handle_command(RegistryCommand::Chat {
            session_id: alice,
            text: "hi".to_string(),
        });

        assert!(bob_cancel.is_cancelled());
        assert_eq!(drain(&mut carol_rx), vec!["[alice]: hi"]);
    }
}
