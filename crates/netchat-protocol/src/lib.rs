//! netchat Protocol - Wire text for the chat relay
//!
//! This crate provides the messages the server writes to clients and the
//! decoding of what clients send back.

pub mod message;
pub mod parse;

pub use message::{
    ServerMessage, BANNER, NAME_EMPTY, NAME_INVALID, NAME_PROMPT, NAME_TAKEN, ROOM_FULL,
    TIMESTAMP_FORMAT,
};
pub use parse::{decode_chunk, READ_BUFFER_SIZE};
