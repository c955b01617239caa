//! Domain-specific error types following panic-free policy.

use thiserror::Error;

/// Errors that can occur in domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Name was empty after trimming whitespace
    #[error("Display name is empty")]
    EmptyName,

    /// Name contains characters that cannot be shown in a chat line
    #[error("Display name contains control characters: {name}")]
    InvalidName { name: String },

    /// Name is longer than the allowed maximum
    #[error("Display name is {len} characters (max: {max})")]
    NameTooLong { len: usize, max: usize },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
