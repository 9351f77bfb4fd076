//! Framed commit journal.

use crate::backend::JournalBackend;
use crate::error::{StorageError, StorageResult};
use sha2::{Digest, Sha256};
use tracing::warn;

/// Magic bytes opening every frame.
pub const FRAME_MAGIC: [u8; 4] = *b"EGJR";

/// Current frame format version.
pub const FRAME_VERSION: u16 = 1;

/// magic (4) + version (2) + length (4)
const HEADER_SIZE: usize = 10;

const CHECKSUM_SIZE: usize = 4;

/// Computes the frame checksum: the first four bytes of SHA-256.
#[must_use]
pub fn frame_checksum(data: &[u8]) -> [u8; 4] {
    let digest = Sha256::digest(data);
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Wraps a payload in a frame envelope.
///
/// # Errors
///
/// Returns [`StorageError::PayloadTooLarge`] if the payload length does not
/// fit the 4-byte length field.
pub fn encode_frame(payload: &[u8]) -> StorageResult<Vec<u8>> {
    let len = u32::try_from(payload.len())
        .map_err(|_| StorageError::PayloadTooLarge { len: payload.len() })?;

    let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CHECKSUM_SIZE);
    data.extend_from_slice(&FRAME_MAGIC);
    data.extend_from_slice(&FRAME_VERSION.to_le_bytes());
    data.extend_from_slice(&len.to_le_bytes());
    data.extend_from_slice(payload);
    let checksum = frame_checksum(&data);
    data.extend_from_slice(&checksum);
    Ok(data)
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Byte offset of the frame within the journal.
    pub offset: u64,
    /// Frame payload.
    pub payload: Vec<u8>,
}

/// Result of scanning raw journal bytes.
#[derive(Debug, Clone, Default)]
pub struct FrameScan {
    /// Complete, verified frames in journal order.
    pub frames: Vec<Frame>,
    /// Length of the prefix made of complete frames.
    pub valid_len: u64,
    /// Whether trailing bytes formed an incomplete frame.
    pub torn_tail: bool,
}

/// Splits raw journal bytes into frames.
///
/// An incomplete frame at the end is reported through
/// [`FrameScan::torn_tail`]; it is what a crash in the middle of an append
/// leaves behind.
///
/// # Errors
///
/// Returns [`StorageError::Corrupted`] for a bad magic, an unsupported version
/// or a checksum mismatch.
pub fn scan_frames(data: &[u8]) -> StorageResult<FrameScan> {
    let mut scan = FrameScan::default();
    let mut pos = 0usize;

    while pos < data.len() {
        let remaining = data.len() - pos;
        if remaining < HEADER_SIZE {
            scan.torn_tail = true;
            break;
        }

        let header = &data[pos..pos + HEADER_SIZE];
        if header[0..4] != FRAME_MAGIC {
            return Err(StorageError::corrupted(pos as u64, "invalid frame magic"));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != FRAME_VERSION {
            return Err(StorageError::corrupted(
                pos as u64,
                format!("unsupported frame version {version}"),
            ));
        }
        let len = u32::from_le_bytes([header[6], header[7], header[8], header[9]]) as usize;

        let total = HEADER_SIZE + len + CHECKSUM_SIZE;
        if remaining < total {
            scan.torn_tail = true;
            break;
        }

        let body_end = pos + HEADER_SIZE + len;
        let expected = frame_checksum(&data[pos..body_end]);
        if data[body_end..body_end + CHECKSUM_SIZE] != expected {
            return Err(StorageError::corrupted(pos as u64, "checksum mismatch"));
        }

        scan.frames.push(Frame {
            offset: pos as u64,
            payload: data[pos + HEADER_SIZE..body_end].to_vec(),
        });
        pos += total;
        scan.valid_len = pos as u64;
    }

    Ok(scan)
}

/// An append-only log of framed payloads over a [`JournalBackend`].
///
/// Each [`Journal::append`] writes exactly one frame. If the backend fails
/// midway the journal cuts itself back to its previous length, so a failed
/// append leaves no trace.
pub struct Journal {
    backend: Box<dyn JournalBackend>,
    sync_on_append: bool,
}

impl Journal {
    /// Creates a journal over a backend.
    #[must_use]
    pub fn new(backend: Box<dyn JournalBackend>, sync_on_append: bool) -> Self {
        Self {
            backend,
            sync_on_append,
        }
    }

    /// Appends one frame and returns its offset.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the journal is restored to its previous
    /// length before returning.
    pub fn append(&mut self, payload: &[u8]) -> StorageResult<u64> {
        let frame = encode_frame(payload)?;
        let before = self.backend.size()?;

        let result = self.backend.append(&frame).and_then(|offset| {
            if self.sync_on_append {
                self.backend.sync()?;
            }
            Ok(offset)
        });

        if result.is_err() {
            self.discard_after(before);
        }
        result
    }

    /// Removes everything written after `len`, keeping the frames before it.
    ///
    /// # Errors
    ///
    /// Returns the backend error if truncation fails.
    pub fn truncate(&mut self, len: u64) -> StorageResult<()> {
        self.backend.truncate(len)?;
        self.backend.sync()
    }

    /// Reads and verifies all frames, trimming a torn tail if one is present.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Corrupted`] if a complete frame fails
    /// verification.
    pub fn recover(&mut self) -> StorageResult<Vec<Frame>> {
        let data = self.backend.read_all()?;
        let scan = scan_frames(&data)?;
        if scan.torn_tail {
            warn!(
                valid_len = scan.valid_len,
                size = data.len(),
                "discarding incomplete journal frame"
            );
            self.backend.truncate(scan.valid_len)?;
            self.backend.sync()?;
        }
        Ok(scan.frames)
    }

    /// Atomically replaces the journal with the given payloads.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the old content stays in place.
    pub fn rewrite(&mut self, payloads: &[Vec<u8>]) -> StorageResult<()> {
        let mut data = Vec::new();
        for payload in payloads {
            data.extend_from_slice(&encode_frame(payload)?);
        }
        self.backend.replace(&data)
    }

    /// Returns the journal size in bytes.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub fn size(&self) -> StorageResult<u64> {
        self.backend.size()
    }

    fn discard_after(&mut self, len: u64) {
        let current = match self.backend.size() {
            Ok(size) => size,
            Err(_) => return,
        };
        if current > len {
            if let Err(e) = self.backend.truncate(len) {
                warn!(error = %e, len, "failed to discard partial journal frame");
            }
        }
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("size", &self.backend.size().ok())
            .field("sync_on_append", &self.sync_on_append)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryJournal;
    use proptest::prelude::*;

    fn journal_with(backend: &InMemoryJournal) -> Journal {
        Journal::new(Box::new(backend.clone()), true)
    }

    #[test]
    fn append_then_recover() {
        let backend = InMemoryJournal::new();
        let mut journal = journal_with(&backend);

        journal.append(b"first").unwrap();
        journal.append(b"second").unwrap();

        let frames = journal.recover().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].offset, 0);
        assert_eq!(frames[1].payload, b"second");
    }

    #[test]
    fn torn_tail_is_trimmed() {
        let backend = InMemoryJournal::new();
        let mut journal = journal_with(&backend);
        journal.append(b"complete").unwrap();
        let good_len = journal.size().unwrap();

        let partial = encode_frame(b"never finished").unwrap();
        let mut raw = backend.clone();
        raw.append(&partial[..partial.len() - 3]).unwrap();

        let frames = journal.recover().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(backend.data().len() as u64, good_len);
    }

    #[test]
    fn checksum_mismatch_is_fatal() {
        let mut data = encode_frame(b"payload").unwrap();
        data[HEADER_SIZE] ^= 0xFF;

        let result = scan_frames(&data);
        assert!(matches!(result, Err(StorageError::Corrupted { offset: 0, .. })));
    }

    #[test]
    fn bad_magic_is_fatal() {
        let mut data = encode_frame(b"payload").unwrap();
        data[0] = b'X';
        assert!(scan_frames(&data).is_err());
    }

    #[test]
    fn failed_append_leaves_no_trace() {
        let backend = InMemoryJournal::new();
        let mut journal = journal_with(&backend);
        journal.append(b"kept").unwrap();
        let before = backend.data();

        backend.set_fail_writes(true);
        assert!(journal.append(b"lost").is_err());
        backend.set_fail_writes(false);

        assert_eq!(backend.data(), before);
    }

    #[test]
    fn rewrite_replaces_frames() {
        let backend = InMemoryJournal::new();
        let mut journal = journal_with(&backend);
        for i in 0..5u8 {
            journal.append(&[i]).unwrap();
        }

        journal.rewrite(&[b"merged".to_vec()]).unwrap();
        let frames = journal.recover().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, b"merged");
    }

    proptest! {
        #[test]
        fn any_truncation_yields_a_prefix(
            payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 1..8),
            cut in any::<prop::sample::Index>(),
        ) {
            let mut data = Vec::new();
            for p in &payloads {
                data.extend_from_slice(&encode_frame(p).unwrap());
            }
            let cut_at = cut.index(data.len() + 1);
            let scan = scan_frames(&data[..cut_at]).unwrap();

            prop_assert!(scan.frames.len() <= payloads.len());
            for (frame, payload) in scan.frames.iter().zip(&payloads) {
                prop_assert_eq!(&frame.payload, payload);
            }
            prop_assert_eq!(scan.torn_tail, scan.valid_len != cut_at as u64);
        }
    }
}
