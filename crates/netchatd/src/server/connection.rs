//! Connection handler for individual chat clients.
//!
//! Each admitted connection gets its own `ConnectionHandler` that:
//! - Sends the banner and name prompt
//! - Negotiates a unique display name
//! - Relays every non-blank read to the other sessions
//! - Cleans up when the client goes away or the server shuts down
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Connection errors are logged and result in graceful disconnect

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use netchat_core::{ConnectionId, DisplayName, DomainError, Session};
use netchat_protocol::{decode_chunk, ServerMessage, READ_BUFFER_SIZE};

use crate::broadcast::{spawn_writer, BroadcastOutcome, Broadcaster};
use crate::registry::{outbound_queue, Inbox, RegistryError, Slot};

/// Lifecycle of a connection.
///
/// ```text
/// Connecting ──▶ Handshaking ──▶ Active ──▶ Closed
///                     │                       ▲
///                     └───────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted, slot reserved, nothing sent yet
    Connecting,
    /// Banner sent, waiting for a name
    Handshaking,
    /// Registered and relaying messages
    Active,
    /// Cleaned up
    Closed,
}

impl ConnectionState {
    /// Returns true if moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        matches!(
            (self, next),
            (Self::Connecting, Self::Handshaking)
                | (Self::Connecting, Self::Closed)
                | (Self::Handshaking, Self::Active)
                | (Self::Handshaking, Self::Closed)
                | (Self::Active, Self::Closed)
        )
    }
}

/// Why a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The handshake was refused (name taken or invalid)
    Rejected,
    /// The client closed its end or a read failed
    Disconnected,
    /// The server is shutting down
    Shutdown,
}

/// Connection handler for a single client.
pub struct ConnectionHandler {
    id: ConnectionId,
    peer_addr: SocketAddr,
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    slot: Slot,
    broadcaster: Broadcaster,
    queue_capacity: usize,
    cancel_token: CancellationToken,
    state: ConnectionState,
}

impl ConnectionHandler {
    /// Creates a handler for an admitted connection.
    ///
    /// # Arguments
    ///
    /// * `stream` - The accepted socket
    /// * `peer_addr` - Remote address, for logging
    /// * `slot` - Admission slot reserved for this connection
    /// * `queue_capacity` - Outbound queue size once registered
    /// * `cancel_token` - Server shutdown token
    pub fn new(
        stream: TcpStream,
        peer_addr: SocketAddr,
        slot: Slot,
        queue_capacity: usize,
        cancel_token: CancellationToken,
    ) -> Self {
        let (reader, writer) = stream.into_split();
        let broadcaster = Broadcaster::new(slot.registry().clone());

        Self {
            id: slot.id(),
            peer_addr,
            reader,
            writer,
            slot,
            broadcaster,
            queue_capacity,
            cancel_token,
            state: ConnectionState::Connecting,
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        self.state = advance(self.id, self.state, next);
    }

    /// Runs the connection to completion.
    ///
    /// Cleanup (session removal, slot release, socket close) happens when
    /// this returns, whichever way the connection ended.
    pub async fn run(mut self) -> CloseReason {
        debug!(connection = %self.id, peer = %self.peer_addr, "Client connected");
        self.transition(ConnectionState::Handshaking);

        let cancel = self.cancel_token.clone();
        let handshake = tokio::select! {
            _ = cancel.cancelled() => Err(ConnectionError::Shutdown),
            result = self.handshake() => result,
        };

        let (session, inbox) = match handshake {
            Ok(registered) => registered,
            Err(e) => {
                let reason = e.close_reason();
                match reason {
                    CloseReason::Rejected => {
                        info!(connection = %self.id, error = %e, "Handshake rejected")
                    }
                    _ => debug!(connection = %self.id, error = %e, "Handshake aborted"),
                }
                self.transition(ConnectionState::Closed);
                return reason;
            }
        };

        self.transition(ConnectionState::Active);
        info!(connection = %self.id, name = %session.name, "Joined the chat");

        let ConnectionHandler {
            id,
            mut reader,
            writer,
            slot,
            broadcaster,
            cancel_token,
            state,
            ..
        } = self;

        let writer_token = cancel_token.child_token();
        let writer_task = spawn_writer(id, writer, inbox, writer_token.clone());

        let reason = tokio::select! {
            _ = cancel_token.cancelled() => CloseReason::Shutdown,
            result = chat_loop(&mut reader, &broadcaster, &session) => {
                debug!(connection = %id, name = %session.name, error = %result, "Read loop ended");
                CloseReason::Disconnected
            }
        };

        cleanup(id, &session, slot, writer_token, writer_task).await;
        advance(id, state, ConnectionState::Closed);
        reason
    }

    /// Sends the greeting, reads a name and registers it.
    async fn handshake(&mut self) -> Result<(Session, Inbox), ConnectionError> {
        self.send(&ServerMessage::Banner).await?;
        self.send(&ServerMessage::NamePrompt).await?;

        let mut buf = [0u8; READ_BUFFER_SIZE];
        let n = self.reader.read(&mut buf).await?;
        if n == 0 {
            return Err(ConnectionError::Eof);
        }

        let raw = String::from_utf8_lossy(buf.get(..n).unwrap_or_default());
        let name = match DisplayName::parse(&raw) {
            Ok(name) => name,
            Err(e) => {
                self.send(&ServerMessage::NameRejected(&e)).await?;
                return Err(ConnectionError::InvalidName(e));
            }
        };

        let (outbox, inbox) = outbound_queue(self.queue_capacity);
        let session = match self.slot.register(name, outbox) {
            Ok(session) => session,
            Err(e) => {
                self.send(&ServerMessage::NameTaken).await?;
                return Err(ConnectionError::Registry(e));
            }
        };

        self.send(&ServerMessage::Welcome(&session.name)).await?;
        Ok((session, inbox))
    }

    /// Writes a message straight to the socket.
    ///
    /// Only used before the writer task takes over the write half.
    async fn send(&mut self, msg: &ServerMessage<'_>) -> Result<(), ConnectionError> {
        self.writer.write_all(msg.to_wire().as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Logs a lifecycle step and returns the new state.
///
/// An illegal step is logged at `warn` but still taken.
fn advance(id: ConnectionId, from: ConnectionState, to: ConnectionState) -> ConnectionState {
    if !from.can_transition_to(to) {
        warn!(connection = %id, from = ?from, to = ?to, "Unexpected connection state transition");
    }
    debug!(connection = %id, from = ?from, to = ?to, "State change");
    to
}

/// Reads chunks and broadcasts them until the client goes away.
///
/// Returns the error that ended the loop; a clean EOF is `ConnectionError::Eof`.
async fn chat_loop(
    reader: &mut OwnedReadHalf,
    broadcaster: &Broadcaster,
    session: &Session,
) -> ConnectionError {
    let mut buf = [0u8; READ_BUFFER_SIZE];

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => return ConnectionError::Eof,
            Ok(n) => n,
            Err(e) => return ConnectionError::Io(e.to_string()),
        };

        let Some(text) = decode_chunk(buf.get(..n).unwrap_or_default()) else {
            debug!(name = %session.name, "Empty message ignored");
            continue;
        };

        info!(name = %session.name, message = %text, "Chat message");

        if let BroadcastOutcome::Relayed { delivered, dropped } =
            broadcaster.broadcast(session.id, &session.name, &text)
        {
            debug!(name = %session.name, delivered, dropped, "Message relayed");
        }
    }
}

/// Removes the session, releases the slot and closes the socket.
async fn cleanup(
    id: ConnectionId,
    session: &Session,
    slot: Slot,
    writer_token: CancellationToken,
    writer_task: JoinHandle<()>,
) {
    // Unregister first so no new broadcasts are queued for us.
    drop(slot);

    writer_token.cancel();
    if let Err(e) = writer_task.await {
        warn!(connection = %id, error = %e, "Writer task failed");
    }

    info!(connection = %id, name = %session.name, "Client disconnected");
}

/// Errors that can occur during connection handling.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Invalid name: {0}")]
    InvalidName(DomainError),

    #[error("Registration refused: {0}")]
    Registry(RegistryError),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Connection closed")]
    Eof,

    #[error("Server shutting down")]
    Shutdown,
}

impl ConnectionError {
    /// Maps the error to the reason the connection closed.
    pub fn close_reason(&self) -> CloseReason {
        match self {
            Self::InvalidName(_) | Self::Registry(_) => CloseReason::Rejected,
            Self::Io(_) | Self::Eof => CloseReason::Disconnected,
            Self::Shutdown => CloseReason::Shutdown,
        }
    }
}

impl From<std::io::Error> for ConnectionError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
