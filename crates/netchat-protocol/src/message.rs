//! Server-to-client message text.
//!
//! The wire format is plain text with no envelope, so every message the
//! server can emit is modelled here and rendered through `Display`.

use std::fmt;

use chrono::NaiveDateTime;
use netchat_core::{DisplayName, DomainError};

/// Timestamp layout used in chat lines (sortable, second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Greeting sent to every admitted connection before the name prompt.
pub const BANNER: &str = concat!(
    "Welcome to TCP-Chat!\n",
    "         _nnnn_\n",
    "        dGGGGMMb\n",
    "       @p~qp~~qMb\n",
    "       M|@||@) M|\n",
    "       @,----.JM|\n",
    "      JS^\\__/  qKL\n",
    "     dZP        qKRb\n",
    "    dZP          qKKb\n",
    "   fZP            SMMb\n",
    "   HZM            MMMM\n",
    "   FqM            MMMM\n",
    " __| \".        |\\dS\"qML\n",
    " |    `.       | `' \\Zq\n",
    "_)      \\.___.,|     .'\n",
    "\\____   )MMMMMP|   .'\n",
    "     `-'       `--'\n",
);

pub const NAME_PROMPT: &str = "[ENTER YOUR NAME]: ";
pub const ROOM_FULL: &str = "Chatroom is full. Try again later.\n";
pub const NAME_TAKEN: &str = "Name already taken. Disconnecting...\n";
pub const NAME_EMPTY: &str = "Name cannot be empty. Disconnecting...\n";
pub const NAME_INVALID: &str = "Invalid name. Disconnecting...\n";

/// Messages the server writes to a client socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage<'a> {
    /// ASCII art greeting
    Banner,

    /// Asks the client for a display name
    NamePrompt,

    /// Admission refused because the room is at capacity
    RoomFull,

    /// Another live session already uses the requested name
    NameTaken,

    /// The requested name failed validation
    NameRejected(&'a DomainError),

    /// Handshake succeeded
    Welcome(&'a DisplayName),

    /// A relayed chat message
    Chat {
        at: NaiveDateTime,
        name: &'a DisplayName,
        text: &'a str,
    },
}

impl<'a> ServerMessage<'a> {
    /// Creates a chat line stamped with the given local time.
    pub fn chat(at: NaiveDateTime, name: &'a DisplayName, text: &'a str) -> Self {
        Self::Chat { at, name, text }
    }

    /// Renders the message exactly as it goes on the wire.
    pub fn to_wire(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ServerMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Banner => f.write_str(BANNER),
            Self::NamePrompt => f.write_str(NAME_PROMPT),
            Self::RoomFull => f.write_str(ROOM_FULL),
            Self::NameTaken => f.write_str(NAME_TAKEN),
            Self::NameRejected(DomainError::EmptyName) => f.write_str(NAME_EMPTY),
            Self::NameRejected(DomainError::InvalidName { .. }) => f.write_str(NAME_INVALID),
            Self::NameRejected(DomainError::NameTooLong { max, .. }) => {
                writeln!(f, "Name too long (max {max} characters). Disconnecting...")
            }
            Self::Welcome(name) => writeln!(f, "Welcome, {name}!"),
            Self::Chat { at, name, text } => {
                writeln!(f, "[{}][{name}]:{text}", at.format(TIMESTAMP_FORMAT))
            }
        }
    }
}
