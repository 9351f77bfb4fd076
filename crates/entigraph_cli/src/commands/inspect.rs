//! Inspect command implementation.

use super::{format_size, read_batches, CommandResult};
use crate::Format;
use entigraph_core::{ChangeRecord, CommitBatch};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Journal inspection result.
#[derive(Debug, Default, Serialize)]
pub struct InspectResult {
    /// Journal path.
    pub path: String,
    /// Journal file size in bytes.
    pub size: u64,
    /// Number of commit batches.
    pub batch_count: usize,
    /// Sequence number of the last batch.
    pub last_sequence: u64,
    /// Total change records across all batches.
    pub record_count: usize,
    /// Instances still present after replay.
    pub live_instances: usize,
    /// Per-entity statistics.
    pub entities: BTreeMap<String, EntityStats>,
}

/// Statistics for a single entity.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct EntityStats {
    /// Upsert records.
    pub upserts: usize,
    /// Delete records.
    pub deletes: usize,
    /// Instances still present after replay.
    pub live: usize,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: Format) -> CommandResult<()> {
    let batches = read_batches(path)?;
    let mut result = summarize(batches.iter().map(|(_, batch)| batch));
    result.path = path.display().to_string();
    result.size = std::fs::metadata(path)?.len();

    match format {
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Format::Text => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Tallies records per entity and replays identities to count survivors.
pub fn summarize<'a>(batches: impl IntoIterator<Item = &'a CommitBatch>) -> InspectResult {
    let mut result = InspectResult::default();
    let mut live: BTreeMap<String, HashSet<_>> = BTreeMap::new();

    for batch in batches {
        result.batch_count += 1;
        result.last_sequence = batch.sequence.as_u64();
        for change in &batch.changes {
            result.record_count += 1;
            let stats = result
                .entities
                .entry(change.entity().to_string())
                .or_default();
            let ids = live.entry(change.entity().to_string()).or_default();
            match change {
                ChangeRecord::Upsert { id, .. } => {
                    stats.upserts += 1;
                    ids.insert(*id);
                }
                ChangeRecord::Delete { id, .. } => {
                    stats.deletes += 1;
                    ids.remove(id);
                }
            }
        }
    }

    for (entity, ids) in live {
        if let Some(stats) = result.entities.get_mut(&entity) {
            stats.live = ids.len();
        }
        result.live_instances += ids.len();
    }
    result
}

fn print_text_output(result: &InspectResult) {
    println!("EntiGraph Journal Inspection");
    println!("============================");
    println!();
    println!("Path: {}", result.path);
    println!("Size: {}", format_size(result.size));
    println!();
    println!("Batches:");
    println!("  Count:         {}", result.batch_count);
    println!("  Last sequence: {}", result.last_sequence);
    println!("  Records:       {}", result.record_count);
    println!("  Live:          {}", result.live_instances);

    if !result.entities.is_empty() {
        println!();
        println!("Entities:");
        for (name, stats) in &result.entities {
            println!(
                "  {:<16} {} upserts, {} deletes, {} live",
                name, stats.upserts, stats.deletes, stats.live
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::write_journal;

    #[test]
    fn counts_records_per_entity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.journal");
        write_journal(&path);

        let batches = read_batches(&path).unwrap();
        let result = summarize(batches.iter().map(|(_, b)| b));
        assert_eq!(result.batch_count, 3);
        assert_eq!(result.last_sequence, 3);
        assert_eq!(result.record_count, 4);
        assert_eq!(result.live_instances, 1);
        assert_eq!(
            result.entities["Person"],
            EntityStats {
                upserts: 3,
                deletes: 1,
                live: 1,
            }
        );
    }

    #[test]
    fn empty_journal_has_no_entities() {
        let result = summarize(std::iter::empty());
        assert_eq!(result.batch_count, 0);
        assert!(result.entities.is_empty());
    }
}
