//! Fan-out of chat messages to registered peers.
//!
//! A broadcast snapshots the peer set under the registry lock, releases it,
//! and then pushes the formatted line into each peer's bounded outbound queue
//! without waiting. Every session has a writer task that drains its queue to
//! the socket, so a slow or stalled peer only ever fills its own queue.
//!
//! Delivery is best-effort:
//! - a full queue drops the line for that peer only
//! - a closed queue (peer already gone) is skipped
//! - neither removes the peer; that happens when its own read loop ends

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use netchat_core::{ConnectionId, DisplayName};
use netchat_protocol::ServerMessage;

use crate::registry::{Inbox, Registry};

/// Result of one broadcast call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// The message was blank after trimming and went nowhere
    Empty,

    /// The message was queued for `delivered` peers and dropped for `dropped`
    Relayed { delivered: usize, dropped: usize },
}

/// Relays messages from one session to every other registered session.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<Registry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Broadcasts `text` from `sender`, stamped with the current local time.
    pub fn broadcast(
        &self,
        sender: ConnectionId,
        name: &DisplayName,
        text: &str,
    ) -> BroadcastOutcome {
        self.broadcast_at(Local::now().naive_local(), sender, name, text)
    }

    /// Broadcasts `text` from `sender` with an explicit timestamp.
    pub fn broadcast_at(
        &self,
        at: NaiveDateTime,
        sender: ConnectionId,
        name: &DisplayName,
        text: &str,
    ) -> BroadcastOutcome {
        let text = text.trim();
        if text.is_empty() {
            debug!(connection = %sender, name = %name, "Empty message ignored");
            return BroadcastOutcome::Empty;
        }

        let line: Arc<str> = Arc::from(ServerMessage::chat(at, name, text).to_wire());
        self.fan_out(sender, line)
    }

    /// Queues an already formatted line for every peer except `sender`.
    pub fn fan_out(&self, sender: ConnectionId, line: Arc<str>) -> BroadcastOutcome {
        let peers = self.registry.peers_except(sender);

        let mut delivered = 0;
        let mut dropped = 0;

        for peer in peers {
            match peer.outbox.try_send(Arc::clone(&line)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        from = %sender,
                        to = %peer.id,
                        name = %peer.name,
                        "Outbound queue full, dropping message"
                    );
                    dropped += 1;
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(to = %peer.id, name = %peer.name, "Peer already gone");
                    dropped += 1;
                }
            }
        }

        BroadcastOutcome::Relayed { delivered, dropped }
    }
}

/// Spawns the task that drains a session's outbound queue into `writer`.
///
/// The task ends when every sender of the queue is dropped, when `cancel`
/// fires, or on the first write error. A write error is logged and does not
/// touch the registry.
pub fn spawn_writer<W>(
    id: ConnectionId,
    mut writer: W,
    mut inbox: Inbox,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let line = tokio::select! {
                _ = cancel.cancelled() => break,
                line = inbox.recv() => match line {
                    Some(line) => line,
                    None => break,
                },
            };

            // A peer that stops reading can block this write indefinitely.
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = async {
                    writer.write_all(line.as_bytes()).await?;
                    writer.flush().await
                } => result,
            };

            if let Err(e) = result {
                warn!(connection = %id, error = %e, "Failed to deliver message");
                break;
            }
        }

        let _ = writer.shutdown().await;
        debug!(connection = %id, "Writer stopped");
    })
}
