//! Dump command implementation.

use super::{read_batches, CommandResult};
use crate::Format;
use entigraph_core::{ChangeRecord, CommitBatch, RelationValue, Value};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;

/// Commit batch representation for output.
#[derive(Debug, Serialize)]
pub struct BatchInfo {
    /// Offset of the frame in the journal file.
    pub offset: u64,
    /// Commit sequence number.
    pub sequence: u64,
    /// Change records in commit order.
    pub changes: Vec<ChangeInfo>,
}

/// Change record representation for output.
#[derive(Debug, Serialize)]
pub struct ChangeInfo {
    /// `upsert` or `delete`.
    pub kind: &'static str,
    /// Entity name.
    pub entity: String,
    /// Instance identity.
    pub id: String,
    /// Attribute values (upserts only).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, serde_json::Value>,
    /// Related identities (upserts only).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, serde_json::Value>,
}

/// Runs the dump command.
pub fn run(path: &Path, limit: Option<usize>, format: Format) -> CommandResult<()> {
    let batches: Vec<BatchInfo> = read_batches(path)?
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|(offset, batch)| describe(*offset, batch))
        .collect();

    match format {
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(&batches)?);
        }
        Format::Text => {
            print_text_output(&batches);
        }
    }

    Ok(())
}

/// Converts a decoded batch into its printable form.
pub fn describe(offset: u64, batch: &CommitBatch) -> BatchInfo {
    BatchInfo {
        offset,
        sequence: batch.sequence.as_u64(),
        changes: batch.changes.iter().map(describe_change).collect(),
    }
}

fn describe_change(change: &ChangeRecord) -> ChangeInfo {
    match change {
        ChangeRecord::Upsert {
            id,
            entity,
            attributes,
            relationships,
        } => ChangeInfo {
            kind: "upsert",
            entity: entity.clone(),
            id: id.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.clone(), json_value(v)))
                .collect(),
            relationships: relationships
                .iter()
                .map(|(k, v)| (k.clone(), json_relation(v)))
                .collect(),
        },
        ChangeRecord::Delete { id, entity } => ChangeInfo {
            kind: "delete",
            entity: entity.clone(),
            id: id.to_string(),
            attributes: BTreeMap::new(),
            relationships: BTreeMap::new(),
        },
    }
}

/// Converts an attribute value to plain JSON.
///
/// Timestamps become milliseconds and bytes become a hex string.
pub fn json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => json!(b),
        Value::Integer(n) | Value::Timestamp(n) => json!(n),
        Value::Float(x) => json!(x),
        Value::Text(s) => json!(s),
        Value::Bytes(bytes) => json!(hex_encode(bytes)),
    }
}

fn json_relation(value: &RelationValue) -> serde_json::Value {
    match value {
        RelationValue::One(None) => serde_json::Value::Null,
        RelationValue::One(Some(id)) => json!(id.to_string()),
        RelationValue::Many(ids) => {
            json!(ids.iter().map(ToString::to_string).collect::<Vec<_>>())
        }
    }
}

fn print_text_output(batches: &[BatchInfo]) {
    println!("Commit Batches ({} total)", batches.len());
    println!("==================");
    println!();

    for batch in batches {
        println!(
            "[{:08}] seq={} changes={}",
            batch.offset,
            batch.sequence,
            batch.changes.len()
        );
        for change in &batch.changes {
            print!(
                "    {:6} {} {}...",
                change.kind,
                change.entity,
                &change.id[..8.min(change.id.len())]
            );
            for (key, value) in &change.attributes {
                print!(" {}={}", key, value);
            }
            for (key, value) in &change.relationships {
                print!(" {}->{}", key, value);
            }
            println!();
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::write_journal;

    #[test]
    fn values_become_plain_json() {
        assert_eq!(json_value(&Value::Null), serde_json::Value::Null);
        assert_eq!(json_value(&Value::Integer(29)), json!(29));
        assert_eq!(json_value(&Value::Timestamp(5)), json!(5));
        assert_eq!(json_value(&Value::from("Ahmed")), json!("Ahmed"));
        assert_eq!(json_value(&Value::Bytes(vec![0xAB, 0x01])), json!("ab01"));
    }

    #[test]
    fn describes_upserts_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.journal");
        write_journal(&path);

        let batches = read_batches(&path).unwrap();
        let first = describe(batches[0].0, &batches[0].1);
        assert_eq!(first.sequence, 1);
        assert_eq!(first.changes.len(), 2);
        assert_eq!(first.changes[0].kind, "upsert");
        assert_eq!(first.changes[0].attributes["name"], json!("Ahmed"));

        let last = describe(batches[2].0, &batches[2].1);
        assert_eq!(last.changes[0].kind, "delete");
        assert!(last.changes[0].attributes.is_empty());

        let rendered = serde_json::to_value(&last).unwrap();
        assert!(rendered["changes"][0].get("attributes").is_none());
    }
}
