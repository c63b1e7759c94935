//! Error types for reference operations.

use thiserror::Error;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// A direct-ref read hit a symbolic ref.
    #[error("ref is symbolic: {name}")]
    UnexpectedSymbolic { name: String },

    /// A symbolic-ref read hit a direct ref.
    #[error("ref is not symbolic: {name}")]
    UnexpectedDirect { name: String },

    /// The stored value could not be decoded as a ref value.
    #[error("malformed ref value for {name}: {value:?}")]
    MalformedValue { name: String, value: String },

    /// The ref name is invalid.
    #[error("invalid ref name: {name}: {reason}")]
    InvalidName { name: String, reason: String },

    /// Timed out waiting for the ref database lock.
    #[error("timed out acquiring ref database lock")]
    LockTimeout,

    /// I/O error during file-based ref operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for ref operations.
pub type RefResult<T> = std::result::Result<T, RefError>;
