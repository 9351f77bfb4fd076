//! # EntiGraph Storage
//!
//! Durable journal backends for EntiGraph.
//!
//! A backend is an **opaque, append-only byte store**. It knows nothing about
//! entities or commit batches; the [`Journal`] wraps a backend and adds the
//! framing that makes each commit batch land atomically:
//!
//! ```text
//! | magic "EGJR" (4) | version (2) | length (4) | payload (N) | checksum (4) |
//! ```
//!
//! The checksum is the first four bytes of the SHA-256 digest of everything
//! before it. A frame cut short at the end of the log (a crash mid-append) is
//! treated as a clean end-of-log and trimmed on recovery. A checksum or magic
//! mismatch anywhere is fatal.
//!
//! ## Available Backends
//!
//! - [`InMemoryJournal`] - For tests and ephemeral contexts
//! - [`FileJournal`] - A single journal file guarded by an exclusive lock file
//!
//! ## Example
//!
//! ```rust
//! use entigraph_storage::{InMemoryJournal, Journal};
//!
//! let mut journal = Journal::new(Box::new(InMemoryJournal::new()), true);
//! journal.append(b"batch one").unwrap();
//! let frames = journal.recover().unwrap();
//! assert_eq!(frames[0].payload, b"batch one");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod journal;
mod memory;

pub use backend::JournalBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileJournal;
pub use journal::{
    encode_frame, frame_checksum, scan_frames, Frame, FrameScan, Journal, FRAME_MAGIC,
    FRAME_VERSION,
};
pub use memory::InMemoryJournal;
