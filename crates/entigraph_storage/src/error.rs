//! Error types for journal storage.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while reading or writing a journal.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The journal contents are damaged.
    #[error("journal corrupted at offset {offset}: {message}")]
    Corrupted {
        /// Byte offset of the damaged frame.
        offset: u64,
        /// Description of the damage.
        message: String,
    },

    /// Another process holds the journal lock.
    #[error("journal locked: {path}")]
    Locked {
        /// Path of the lock file.
        path: String,
    },

    /// A payload does not fit in a single frame.
    #[error("payload of {len} bytes exceeds the frame limit")]
    PayloadTooLarge {
        /// Payload length in bytes.
        len: usize,
    },

    /// Truncation target lies beyond the end of the journal.
    #[error("cannot truncate to {requested} bytes, journal holds {size}")]
    TruncateBeyondEnd {
        /// Requested length.
        requested: u64,
        /// Current length.
        size: u64,
    },
}

impl StorageError {
    /// Creates a corruption error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::Corrupted {
            offset,
            message: message.into(),
        }
    }
}
