//! netchat client library.
//!
//! A line-oriented terminal client for the netchat relay. The server drives
//! the whole conversation, so the client only relays bytes:
//!
//! ```text
//! stdin ──lines──▶ ChatClient ──TCP──▶ netchatd
//! stdout ◀──chunks── ChatClient ◀──TCP── netchatd
//! ```
//!
//! Both directions run concurrently and stop together on the first of
//! server close, end of input, or cancellation.

pub mod client;
pub mod error;

pub use client::{ChatClient, ExitReason};
pub use error::{ClientError, Result};
