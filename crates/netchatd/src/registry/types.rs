//! Registry errors and the values it hands out.
//!
//! - `RegistryError`: admission and handshake rejections
//! - `Peer`: a snapshot of one registered session used for fan-out
//! - `Outbox` / `Inbox`: the bounded per-session queue of outbound lines

use std::sync::Arc;

use netchat_core::{ConnectionId, DisplayName};
use thiserror::Error;
use tokio::sync::mpsc;

// ============================================================================
// Outbound Queue
// ============================================================================

/// Sending side of a session's outbound queue. Cheap to clone.
pub type Outbox = mpsc::Sender<Arc<str>>;

/// Receiving side of a session's outbound queue, drained by its writer task.
pub type Inbox = mpsc::Receiver<Arc<str>>;

/// Creates a bounded outbound queue.
///
/// A capacity of zero is raised to one.
pub fn outbound_queue(capacity: usize) -> (Outbox, Inbox) {
    mpsc::channel(capacity.max(1))
}

// ============================================================================
// Peer Snapshot
// ============================================================================

/// A registered session as seen by the broadcaster.
///
/// Taken under the registry lock and used after it is released, so it may
/// describe a session that has since disconnected. Sends to such a peer fail
/// with a closed queue, which the broadcaster tolerates.
#[derive(Debug, Clone)]
pub struct Peer {
    pub id: ConnectionId,
    pub name: DisplayName,
    pub outbox: Outbox,
}

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors that can occur during registry operations.
///
/// None of these are failures of the registry itself; they are the defined
/// rejection paths for admission and name negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Occupancy is at the ceiling
    #[error("chatroom is full (max: {max} connections)")]
    RoomFull { max: usize },

    /// A live session already uses this name
    #[error("name already taken: {0}")]
    NameTaken(DisplayName),

    /// This connection already completed its handshake
    #[error("connection already registered: {0}")]
    AlreadyRegistered(ConnectionId),
}
