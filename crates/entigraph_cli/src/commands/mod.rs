//! CLI command implementations.

pub mod compact;
pub mod dump;
pub mod inspect;
pub mod verify;

use entigraph_core::CommitBatch;
use entigraph_storage::{scan_frames, FileJournal};
use std::path::Path;

/// Result type shared by the commands.
pub type CommandResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Reads a journal file and decodes every complete frame.
///
/// A torn tail is ignored here; the file itself is left as it is.
pub fn read_batches(path: &Path) -> CommandResult<Vec<(u64, CommitBatch)>> {
    if !path.exists() {
        return Err(format!("No journal found at {}", path.display()).into());
    }
    let data = FileJournal::read_file(path)?;
    let scan = scan_frames(&data)?;
    let mut batches = Vec::with_capacity(scan.frames.len());
    for frame in scan.frames {
        batches.push((frame.offset, CommitBatch::decode(&frame.payload)?));
    }
    Ok(batches)
}

/// Formats a byte count for humans.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} bytes", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_every_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.journal");
        test_support::write_journal(&path);

        let batches = read_batches(&path).unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].0, 0);
        assert_eq!(batches[2].1.sequence.as_u64(), 3);
    }

    #[test]
    fn missing_journal_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_batches(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn sizes_are_humanized() {
        assert_eq!(format_size(12), "12 bytes");
        assert_eq!(format_size(2048), "2.0 KB");
    }
}
