//! Shared error taxonomy.
//!
//! Per the error handling design: precondition violations are fatal to the
//! call but leave the manager usable (`IllegalState`); log I/O errors abort
//! the current operation and defer to recovery on the next `enable`; a
//! heuristic post-commit store failure is the one condition serious enough
//! to call for [`Error::Fatal`], which callers should treat as a signal to
//! `close()` the manager.

use thiserror::Error;

/// Errors surfaced by the transaction manager and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// The manager (or a record) was not in a state that permits the
    /// requested operation: wrong lifecycle state, unknown write id,
    /// duplicate client, store already enlisted, and so on.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A store rejected or failed an operation it was asked to perform.
    #[error("store error: {0}")]
    Store(String),

    /// The durable log could not be read or written.
    #[error("log I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A log record or status file failed to (de)serialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Recovery examined the on-disk log and found it unrecoverable.
    #[error("recovery failed: {0}")]
    Recovery(String),

    /// An irrecoverable inconsistency between the durable log and the
    /// storage shards it describes. The manager should stop accepting new
    /// work; callers should invoke `close()`.
    #[error("fatal inconsistency: {0}")]
    Fatal(String),
}

/// Result type used throughout the manager.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// `true` for errors that leave the manager otherwise usable.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::IllegalState(_))
    }

    /// `true` for the one error class that should trigger a shutdown.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Fatal(_))
    }
}
