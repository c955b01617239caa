//! Admission slot held by each connection handler.
//!
//! A `Slot` is the only way to register a session, and dropping it is the
//! only way to give the reservation back. Cleanup therefore runs on every
//! exit path of a handler: normal return, error, panic, or task abort.

use std::sync::Arc;

use tracing::info;

use netchat_core::{ConnectionId, DisplayName, Session};

use super::store::Registry;
use super::types::{Outbox, RegistryError};

/// An occupied admission slot.
pub struct Slot {
    registry: Arc<Registry>,
    id: ConnectionId,
}

impl Slot {
    pub(super) fn new(registry: Arc<Registry>, id: ConnectionId) -> Self {
        Self { registry, id }
    }

    /// Returns the connection this slot was reserved for.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the registry this slot belongs to.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Registers this connection under `name`.
    ///
    /// The uniqueness check and the insert happen in one critical section.
    /// Broadcasts to the new session are queued on `outbox`.
    ///
    /// # Errors
    ///
    /// - `RegistryError::NameTaken` if a live session already uses `name`
    /// - `RegistryError::AlreadyRegistered` if this slot already registered
    pub fn register(&mut self, name: DisplayName, outbox: Outbox) -> Result<Session, RegistryError> {
        self.registry.insert_if_unique(self.id, name, outbox)
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        if let Some(session) = self.registry.release(self.id) {
            info!(connection = %self.id, name = %session.name, "Session left");
        }
    }
}

impl std::fmt::Debug for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot").field("id", &self.id).finish()
    }
}
