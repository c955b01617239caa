//! Session domain entities and value objects.

use crate::error::{DomainError, DomainResult};
use chrono::{DateTime, Local};
use std::fmt;

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Opaque handle for one accepted connection.
///
/// Allocated by the server from a monotonically increasing counter, so two
/// connections alive at the same time never share a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ============================================================================
// Display Name
// ============================================================================

/// Maximum length of a display name, in characters.
pub const MAX_NAME_CHARS: usize = 32;

/// A validated chat display name.
///
/// Always non-empty, free of surrounding whitespace and control characters,
/// and at most [`MAX_NAME_CHARS`] characters long. Uniqueness is a registry
/// concern and is not checked here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayName(String);

impl DisplayName {
    /// Parses a candidate name as read off the wire.
    ///
    /// Surrounding whitespace is trimmed before validation.
    ///
    /// # Errors
    ///
    /// - `DomainError::EmptyName` if nothing is left after trimming
    /// - `DomainError::InvalidName` if the name contains control characters
    /// - `DomainError::NameTooLong` if the name exceeds [`MAX_NAME_CHARS`]
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let name = raw.trim();

        if name.is_empty() {
            return Err(DomainError::EmptyName);
        }

        if name.chars().any(char::is_control) {
            return Err(DomainError::InvalidName {
                name: name.escape_debug().to_string(),
            });
        }

        let len = name.chars().count();
        if len > MAX_NAME_CHARS {
            return Err(DomainError::NameTooLong {
                len,
                max: MAX_NAME_CHARS,
            });
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for DisplayName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for DisplayName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// ============================================================================
// Session
// ============================================================================

/// A registered chat participant.
///
/// Created once the handshake succeeds and never renamed afterwards.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: ConnectionId,
    pub name: DisplayName,
    /// When the session joined. Informational only.
    pub joined_at: DateTime<Local>,
}

impl Session {
    /// Creates a session that joined just now.
    pub fn new(id: ConnectionId, name: DisplayName) -> Self {
        Self {
            id,
            name,
            joined_at: Local::now(),
        }
    }
}
