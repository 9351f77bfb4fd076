//! In-memory journal backend.

use crate::backend::JournalBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An in-memory journal backend.
///
/// Clones share the same buffer, so a test can keep a handle to a journal it
/// has handed to a context, inspect what was written, and open a second
/// context over the same bytes to simulate a restart.
///
/// # Example
///
/// ```rust
/// use entigraph_storage::{InMemoryJournal, JournalBackend};
///
/// let mut backend = InMemoryJournal::new();
/// let observer = backend.clone();
/// backend.append(b"abc").unwrap();
/// assert_eq!(observer.data(), b"abc");
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryJournal {
    data: Arc<RwLock<Vec<u8>>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryJournal {
    /// Creates a new empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a journal holding pre-existing bytes.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a copy of the stored bytes.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    /// Makes every subsequent write (`append`, `replace`) fail with an I/O error.
    ///
    /// Used to exercise commit failure paths.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::Other,
                "injected write failure",
            )));
        }
        Ok(())
    }
}

impl JournalBackend for InMemoryJournal {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        Ok(self.data.read().clone())
    }

    fn append(&mut self, new_data: &[u8]) -> StorageResult<u64> {
        self.check_writable()?;
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(new_data);
        Ok(offset)
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let mut data = self.data.write();
        let size = data.len() as u64;
        if new_size > size {
            return Err(StorageError::TruncateBeyondEnd {
                requested: new_size,
                size,
            });
        }
        data.truncate(new_size as usize);
        Ok(())
    }

    fn replace(&mut self, new_data: &[u8]) -> StorageResult<()> {
        self.check_writable()?;
        *self.data.write() = new_data.to_vec();
        Ok(())
    }
}
