//! Journal backend trait definition.

use crate::error::StorageResult;

/// A byte store underneath a [`crate::Journal`].
///
/// Backends never interpret the bytes they hold. The journal owns framing and
/// integrity checks; a backend only has to make appends, truncation and whole
/// content replacement behave as described below.
///
/// # Invariants
///
/// - `append` writes at the current end and returns the offset it wrote at
/// - `read_all` returns exactly the bytes appended so far (minus truncation)
/// - `replace` swaps the whole content atomically: a crash leaves either the
///   old or the new content, never a mix
/// - Backends must be `Send + Sync`
pub trait JournalBackend: Send + Sync {
    /// Reads the entire journal content.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium cannot be read.
    fn read_all(&self) -> StorageResult<Vec<u8>>;

    /// Appends data at the end and returns the offset where it was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Makes every appended byte durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Returns the current size in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Cuts the journal back to `new_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::TruncateBeyondEnd`] if `new_size` is larger
    /// than the current size, or an I/O error.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Atomically replaces the whole content with `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the replacement could not be made durable. The old
    /// content is left in place in that case.
    fn replace(&mut self, data: &[u8]) -> StorageResult<()>;
}
