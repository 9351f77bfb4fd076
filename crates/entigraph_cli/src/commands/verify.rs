//! Verify command implementation.

use super::CommandResult;
use entigraph_core::CommitBatch;
use entigraph_storage::{scan_frames, FileJournal, StorageError};
use std::path::Path;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of complete frames checked.
    pub frames_checked: usize,
    /// Frames whose payload decoded into a batch.
    pub valid_batches: usize,
    /// Bytes after the last complete frame.
    pub torn_bytes: u64,
    /// List of errors found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    /// Returns true if no errors were found.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the verify command.
pub fn run(path: &Path) -> CommandResult<()> {
    println!("Verifying journal at {}", path.display());
    println!();

    if !path.exists() {
        return Err(format!("No journal found at {}", path.display()).into());
    }
    let data = FileJournal::read_file(path)?;
    let result = verify(&data);

    println!("  Frames checked: {}", result.frames_checked);
    println!("  Valid batches:  {}", result.valid_batches);
    if result.torn_bytes > 0 {
        println!(
            "  Torn tail:      {} bytes (discarded on next open)",
            result.torn_bytes
        );
    }
    for error in &result.errors {
        println!("  ERROR: {}", error);
    }

    println!();
    if result.is_ok() {
        println!("✓ Journal verification passed");
        Ok(())
    } else {
        println!("✗ Journal verification failed");
        Err("Verification failed".into())
    }
}

/// Checks framing, checksums, batch decoding and sequence order.
pub fn verify(data: &[u8]) -> VerifyResult {
    let mut result = VerifyResult::default();

    let scan = match scan_frames(data) {
        Ok(scan) => scan,
        Err(StorageError::Corrupted { offset, message }) => {
            result
                .errors
                .push(format!("Corrupted frame at offset {}: {}", offset, message));
            return result;
        }
        Err(e) => {
            result.errors.push(e.to_string());
            return result;
        }
    };

    result.torn_bytes = data.len() as u64 - scan.valid_len;
    let mut previous = 0u64;
    for frame in &scan.frames {
        result.frames_checked += 1;
        match CommitBatch::decode(&frame.payload) {
            Ok(batch) => {
                let sequence = batch.sequence.as_u64();
                if sequence <= previous {
                    result.errors.push(format!(
                        "Sequence {} at offset {} does not follow {}",
                        sequence, frame.offset, previous
                    ));
                }
                previous = sequence;
                result.valid_batches += 1;
            }
            Err(e) => {
                result.errors.push(format!(
                    "Undecodable batch at offset {}: {}",
                    frame.offset, e
                ));
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::write_journal;
    use entigraph_core::CommitSequence;
    use entigraph_storage::encode_frame;

    fn journal_bytes() -> Vec<u8> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.journal");
        write_journal(&path);
        FileJournal::read_file(&path).unwrap()
    }

    #[test]
    fn healthy_journal_passes() {
        let result = verify(&journal_bytes());
        assert!(result.is_ok(), "{:?}", result.errors);
        assert_eq!(result.frames_checked, 3);
        assert_eq!(result.valid_batches, 3);
        assert_eq!(result.torn_bytes, 0);
    }

    #[test]
    fn torn_tail_is_reported_but_not_an_error() {
        let mut data = journal_bytes();
        data.extend_from_slice(b"EGJR\x01");
        let result = verify(&data);
        assert!(result.is_ok());
        assert_eq!(result.torn_bytes, 5);
    }

    #[test]
    fn checksum_damage_fails() {
        let mut data = journal_bytes();
        let last = data.len() - 1;
        data[last] ^= 0x01;
        let result = verify(&data);
        assert!(!result.is_ok());
        assert!(result.errors[0].contains("Corrupted"));
    }

    #[test]
    fn out_of_order_sequences_fail() {
        let mut data = Vec::new();
        for seq in [2, 1] {
            let batch = CommitBatch::new(CommitSequence::new(seq));
            data.extend_from_slice(&encode_frame(&batch.encode().unwrap()).unwrap());
        }
        let result = verify(&data);
        assert_eq!(result.valid_batches, 2);
        assert_eq!(result.errors.len(), 1);
    }
}
