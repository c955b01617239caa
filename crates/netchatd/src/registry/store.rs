//! The registry itself: live sessions plus occupancy accounting.
//!
//! # Locking
//!
//! All state sits behind one `std::sync::Mutex`. Every operation takes the
//! lock once, does in-memory work only, and releases it before returning, so
//! no critical section ever awaits or touches a socket. Check-and-reserve and
//! check-and-insert are each a single critical section.
//!
//! A poisoned lock is recovered rather than propagated: every mutation below
//! completes before anything that could panic, so the state is consistent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use netchat_core::{ConnectionId, DisplayName, Session};

use super::slot::Slot;
use super::types::{Outbox, Peer, RegistryError};

/// Default admission ceiling.
pub const MAX_CONNECTIONS: usize = 3;

/// A registered session together with its outbound queue.
struct Entry {
    session: Session,
    outbox: Outbox,
}

#[derive(Default)]
struct RegistryState {
    /// Admitted connections, registered or still handshaking
    occupancy: usize,

    /// Connections that completed the handshake
    sessions: HashMap<ConnectionId, Entry>,
}

/// Shared registry of live chat sessions.
///
/// Invariants, held whenever the lock is released:
/// - `occupancy <= max_connections`
/// - `sessions.len() <= occupancy`
/// - display names in `sessions` are pairwise distinct
pub struct Registry {
    state: Mutex<RegistryState>,
    max_connections: usize,
}

impl Registry {
    /// Creates an empty registry with the given admission ceiling.
    pub fn new(max_connections: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(RegistryState::default()),
            max_connections,
        })
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the admission ceiling.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Reserves an admission slot for a freshly accepted connection.
    ///
    /// The returned [`Slot`] releases the reservation, and removes the
    /// session if one was registered through it, when dropped.
    ///
    /// # Errors
    ///
    /// - `RegistryError::RoomFull` if occupancy is at the ceiling
    pub fn try_reserve(self: &Arc<Self>, id: ConnectionId) -> Result<Slot, RegistryError> {
        let mut state = self.lock();

        if state.occupancy >= self.max_connections {
            debug!(
                connection = %id,
                occupancy = state.occupancy,
                max = self.max_connections,
                "Admission refused"
            );
            return Err(RegistryError::RoomFull {
                max: self.max_connections,
            });
        }

        state.occupancy += 1;
        debug!(connection = %id, occupancy = state.occupancy, "Slot reserved");
        drop(state);

        Ok(Slot::new(Arc::clone(self), id))
    }

    /// Inserts a session if no live session already uses `name`.
    ///
    /// Only reachable through [`Slot::register`], so the caller always holds
    /// an admission slot for `id`.
    pub(super) fn insert_if_unique(
        &self,
        id: ConnectionId,
        name: DisplayName,
        outbox: Outbox,
    ) -> Result<Session, RegistryError> {
        let mut state = self.lock();

        if state.sessions.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }

        if state.sessions.values().any(|e| e.session.name == name) {
            return Err(RegistryError::NameTaken(name));
        }

        let session = Session::new(id, name);
        state.sessions.insert(
            id,
            Entry {
                session: session.clone(),
                outbox,
            },
        );

        info!(
            connection = %id,
            name = %session.name,
            sessions = state.sessions.len(),
            "Session registered"
        );

        Ok(session)
    }

    /// Releases the slot held by `id`, removing its session if present.
    ///
    /// Called exactly once per slot, from `Slot::drop`.
    pub(super) fn release(&self, id: ConnectionId) -> Option<Session> {
        let mut state = self.lock();

        let removed = state.sessions.remove(&id).map(|e| e.session);

        match state.occupancy.checked_sub(1) {
            Some(n) => state.occupancy = n,
            None => warn!(connection = %id, "Slot released with zero occupancy"),
        }

        debug!(
            connection = %id,
            occupancy = state.occupancy,
            had_session = removed.is_some(),
            "Slot released"
        );

        removed
    }

    /// Snapshots every registered session except `exclude`.
    ///
    /// The lock is released before this returns; callers write to the peers
    /// without holding it.
    pub fn peers_except(&self, exclude: ConnectionId) -> Vec<Peer> {
        self.lock()
            .sessions
            .iter()
            .filter(|(id, _)| **id != exclude)
            .map(|(id, e)| Peer {
                id: *id,
                name: e.session.name.clone(),
                outbox: e.outbox.clone(),
            })
            .collect()
    }

    /// Number of admitted connections, including ones still handshaking.
    pub fn occupancy(&self) -> usize {
        self.lock().occupancy
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().sessions.is_empty()
    }

    /// Display names of all registered sessions, sorted.
    pub fn names(&self) -> Vec<DisplayName> {
        let mut names: Vec<DisplayName> = self
            .lock()
            .sessions
            .values()
            .map(|e| e.session.name.clone())
            .collect();
        names.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        names
    }
}
