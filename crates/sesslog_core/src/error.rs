//! Error types for sesslog_core operations.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for sesslog_core operations.
#[derive(Error, Debug)]
pub enum SesslogError {
    /// The event payload read from stdin could not be parsed.
    #[error("malformed event payload: {0}")]
    MalformedEvent(String),

    /// A persisted per-session state value could not be read or written.
    #[error("state store error: {0}")]
    StateError(String),

    /// The atomic append and its overflow fallback both failed.
    /// The entry is accepted as lost.
    #[error("entry lost for {}: overflow fallback exhausted", path.display())]
    EntryLost {
        /// The log file the entry was destined for
        path: PathBuf,
    },

    /// Serialization error during state or entry encoding.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for sesslog_core operations.
pub type Result<T> = std::result::Result<T, SesslogError>;
