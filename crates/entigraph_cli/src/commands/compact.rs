//! Compact command implementation.

use super::{format_size, CommandResult};
use entigraph_core::CommitBatch;
use entigraph_storage::{encode_frame, FileJournal, Journal};
use std::path::Path;
use tracing::info;

/// Compaction statistics.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CompactStats {
    /// Input batches.
    pub input_batches: usize,
    /// Input change records.
    pub input_records: usize,
    /// Records in the compacted batch.
    pub output_records: usize,
    /// Bytes before compaction.
    pub bytes_before: u64,
    /// Bytes after compaction.
    pub bytes_after: u64,
}

/// Runs the compact command.
pub fn run(path: &Path, dry_run: bool) -> CommandResult<()> {
    if !path.exists() {
        return Err(format!("No journal found at {}", path.display()).into());
    }

    println!("Compacting journal at {}", path.display());
    if dry_run {
        println!("(dry run - no changes will be made)");
    }
    println!();

    // Opening the file takes the journal lock, so no context can write meanwhile.
    let backend = FileJournal::open(path)?;
    let mut journal = Journal::new(Box::new(backend), true);
    let stats = compact(&mut journal, dry_run)?;

    println!("Compaction Analysis:");
    println!("  Input batches:  {}", stats.input_batches);
    println!("  Input records:  {}", stats.input_records);
    println!("  Output records: {}", stats.output_records);
    println!();
    println!("  Size before: {}", format_size(stats.bytes_before));
    println!("  Size after:  {}", format_size(stats.bytes_after));
    println!(
        "  Space saved: {} ({:.1}%)",
        format_size(stats.bytes_before.saturating_sub(stats.bytes_after)),
        if stats.bytes_before > 0 {
            (stats.bytes_before.saturating_sub(stats.bytes_after)) as f64
                / stats.bytes_before as f64
                * 100.0
        } else {
            0.0
        }
    );

    if !dry_run {
        println!();
        println!("✓ Compaction complete");
    }

    Ok(())
}

/// Folds every batch in `journal` into one, rewriting it unless `dry_run`.
pub fn compact(journal: &mut Journal, dry_run: bool) -> CommandResult<CompactStats> {
    let frames = journal.recover()?;
    let mut batches = Vec::with_capacity(frames.len());
    for frame in &frames {
        batches.push(CommitBatch::decode(&frame.payload)?);
    }

    let mut stats = CompactStats {
        input_batches: batches.len(),
        input_records: batches.iter().map(|b| b.changes.len()).sum(),
        bytes_before: journal.size()?,
        ..CompactStats::default()
    };

    let payloads = match CommitBatch::compact(&batches) {
        Some(batch) => {
            stats.output_records = batch.changes.len();
            vec![batch.encode()?]
        }
        None => Vec::new(),
    };
    stats.bytes_after = payloads
        .iter()
        .map(|p| encode_frame(p).map(|f| f.len() as u64))
        .sum::<Result<u64, _>>()?;

    if !dry_run {
        journal.rewrite(&payloads)?;
        info!(
            before = stats.bytes_before,
            after = stats.bytes_after,
            "rewrote journal"
        );
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::read_batches;
    use crate::commands::test_support::{registry, write_journal};
    use entigraph_core::{Config, Context, FetchRequest, Value};

    #[test]
    fn compaction_keeps_the_final_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.journal");
        write_journal(&path);

        let stats = {
            let mut journal = Journal::new(Box::new(FileJournal::open(&path).unwrap()), true);
            compact(&mut journal, false).unwrap()
        };
        assert_eq!(stats.input_batches, 3);
        assert_eq!(stats.input_records, 4);
        assert_eq!(stats.output_records, 1);
        assert!(stats.bytes_after < stats.bytes_before);

        let batches = read_batches(&path).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].1.sequence.as_u64(), 3);

        let ctx = Context::open(&path, registry(), Config::default()).unwrap();
        assert_eq!(ctx.committed_sequence().as_u64(), 3);
        let people = ctx.find(&FetchRequest::new("Person")).unwrap();
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].get("age"), Some(&Value::Integer(30)));
    }

    #[test]
    fn dry_run_leaves_the_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.journal");
        write_journal(&path);
        let before = FileJournal::read_file(&path).unwrap();

        let mut journal = Journal::new(Box::new(FileJournal::open(&path).unwrap()), true);
        let stats = compact(&mut journal, true).unwrap();
        assert_eq!(stats.output_records, 1);
        assert_eq!(FileJournal::read_file(&path).unwrap(), before);
    }

    #[test]
    fn open_context_blocks_compaction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.journal");
        let _ctx = Context::open(&path, registry(), Config::default()).unwrap();
        assert!(FileJournal::open(&path).is_err());
    }
}
