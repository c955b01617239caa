//! netchat Daemon - Connection registry and broadcast relay
//!
//! This crate provides the server side of netchat:
//! - `registry` - Shared session registry with admission and name checks
//! - `broadcast` - Fan-out of chat lines through per-session queues
//! - `server` - TCP accept loop and per-connection handlers
//! - `config` - Server settings from defaults, file and environment
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        netchatd                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │   ChatServer    │────▶│          Registry           │   │
//! │  │ (TcpListener)   │     │  (single lock, slots)       │   │
//! │  └────────┬────────┘     └──────────────┬──────────────┘   │
//! │           │                             │                   │
//! │           │ connections                 │ peer snapshot     │
//! │           ▼                             ▼                   │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │ConnectionHandler│────▶│        Broadcaster          │   │
//! │  │  (per client)   │     │  (bounded queue per peer)   │   │
//! │  └─────────────────┘     └─────────────────────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod broadcast;
pub mod config;
pub mod registry;
pub mod server;
