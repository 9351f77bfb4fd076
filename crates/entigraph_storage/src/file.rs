//! File-based journal backend.

use crate::backend::JournalBackend;
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use parking_lot::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A journal stored in a single file.
///
/// Opening the journal takes an exclusive advisory lock on a sibling
/// `<name>.lock` file, held until the backend is dropped, so two contexts
/// can never append to the same journal.
///
/// # Durability
///
/// - `sync()` calls `File::sync_all()`
/// - `replace()` writes `<name>.tmp`, syncs it and renames it over the journal
///
/// # Example
///
/// ```no_run
/// use entigraph_storage::{FileJournal, JournalBackend};
/// use std::path::Path;
///
/// let mut backend = FileJournal::open(Path::new("store/journal.egj")).unwrap();
/// backend.append(b"frame").unwrap();
/// backend.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileJournal {
    path: PathBuf,
    file: RwLock<File>,
    size: RwLock<u64>,
    _lock: File,
}

impl FileJournal {
    /// Opens or creates a journal file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another handle holds the lock, or an
    /// I/O error if the files cannot be opened.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock_path = Self::sibling(path, "lock");
        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        if lock.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked {
                path: lock_path.display().to_string(),
            });
        }

        let file = Self::open_data_file(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
            size: RwLock::new(size),
            _lock: lock,
        })
    }

    /// Opens a journal file for reading only, without taking the lock.
    ///
    /// Used by tooling that inspects a journal while it may be in use.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub fn read_file(path: &Path) -> StorageResult<Vec<u8>> {
        Ok(fs::read(path)?)
    }

    /// Returns the journal file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_data_file(path: &Path) -> StorageResult<File> {
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?)
    }

    fn sibling(path: &Path, extension: &str) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(extension);
        PathBuf::from(name)
    }
}

impl JournalBackend for FileJournal {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let mut file = self.file.write();
        file.seek(SeekFrom::Start(0))?;
        let mut buffer = Vec::with_capacity(*self.size.read() as usize);
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let mut file = self.file.write();
        let mut size = self.size.write();

        let offset = *size;
        if data.is_empty() {
            return Ok(offset);
        }
        file.seek(SeekFrom::End(0))?;
        file.write_all(data)?;
        file.flush()?;
        *size += data.len() as u64;

        Ok(offset)
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.file.write().sync_all()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(*self.size.read())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let file = self.file.write();
        let mut size = self.size.write();

        if new_size > *size {
            return Err(StorageError::TruncateBeyondEnd {
                requested: new_size,
                size: *size,
            });
        }

        file.set_len(new_size)?;
        file.sync_all()?;
        *size = new_size;
        Ok(())
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        let tmp_path = Self::sibling(&self.path, "tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(data)?;
            tmp.sync_all()?;
        }

        let mut file = self.file.write();
        let mut size = self.size.write();
        fs::rename(&tmp_path, &self.path)?;
        *file = Self::open_data_file(&self.path)?;
        *size = data.len() as u64;
        Ok(())
    }
}
