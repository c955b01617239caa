//! Connection registry for the chat relay.
//!
//! The registry is the only state shared between connection tasks. It tracks
//! how many connections are admitted and which of them completed the name
//! handshake, and it hands out peer snapshots for broadcasting.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐ try_reserve ┌─────────────────────────────┐
//! │  Accept loop    │────────────▶│          Registry           │
//! └─────────────────┘             │  Mutex<{ occupancy,         │
//!                                 │          sessions }>        │
//! ┌─────────────────┐  register   │                             │
//! │ConnectionHandler│────────────▶│                             │
//! │   (owns Slot)   │  drop(Slot) │                             │
//! └────────┬────────┘────────────▶└──────────────┬──────────────┘
//!          │ broadcast                           │ peers_except
//!          ▼                                     ▼
//! ┌─────────────────┐             ┌─────────────────────────────┐
//! │   Broadcaster   │────────────▶│ per-session Outbox (bounded)│
//! └─────────────────┘  try_send   └─────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All operations in this module follow the panic-free policy:
//! - No `.unwrap()` or `.expect()` in production code
//! - Lock poisoning is recovered, never propagated

mod slot;
mod store;
mod types;

pub use slot::Slot;
pub use store::{Registry, MAX_CONNECTIONS};
pub use types::{outbound_queue, Inbox, Outbox, Peer, RegistryError};
