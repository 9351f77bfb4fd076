//! Commit batch record model.

use crate::error::{CoreError, CoreResult};
use crate::graph::{Instance, RelationValue};
use crate::types::{CommitSequence, ObjectId};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// One instance-level change inside a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChangeRecord {
    /// The full state of an inserted or updated instance.
    Upsert {
        /// Instance identity.
        id: ObjectId,
        /// Entity name.
        entity: String,
        /// Every attribute value.
        attributes: BTreeMap<String, Value>,
        /// Every relationship slot.
        relationships: BTreeMap<String, RelationValue>,
    },
    /// A destroyed instance.
    Delete {
        /// Instance identity.
        id: ObjectId,
        /// Entity name.
        entity: String,
    },
}

impl ChangeRecord {
    /// Captures the current state of an instance.
    #[must_use]
    pub fn upsert(instance: &Instance) -> Self {
        Self::Upsert {
            id: instance.id(),
            entity: instance.entity().to_string(),
            attributes: instance.attributes().clone(),
            relationships: instance.relations().clone(),
        }
    }

    /// Records the removal of an instance.
    #[must_use]
    pub fn delete(instance: &Instance) -> Self {
        Self::Delete {
            id: instance.id(),
            entity: instance.entity().to_string(),
        }
    }

    /// Returns the affected identity.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        match self {
            Self::Upsert { id, .. } | Self::Delete { id, .. } => *id,
        }
    }

    /// Returns the affected entity name.
    #[must_use]
    pub fn entity(&self) -> &str {
        match self {
            Self::Upsert { entity, .. } | Self::Delete { entity, .. } => entity,
        }
    }
}

/// Everything one commit changed, written as a single journal frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitBatch {
    /// Commit sequence number.
    pub sequence: CommitSequence,
    /// Changes in insertion order of the affected instances.
    pub changes: Vec<ChangeRecord>,
}

impl CommitBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new(sequence: CommitSequence) -> Self {
        Self {
            sequence,
            changes: Vec::new(),
        }
    }

    /// Encodes the batch as CBOR.
    ///
    /// # Errors
    ///
    /// Returns `Codec` if serialization fails.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| CoreError::codec(e.to_string()))?;
        Ok(buf)
    }

    /// Decodes a batch from CBOR.
    ///
    /// # Errors
    ///
    /// Returns `Codec` if the bytes are not a valid batch.
    pub fn decode(bytes: &[u8]) -> CoreResult<Self> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::codec(e.to_string()))
    }

    /// Folds a sequence of batches into one holding only the final state.
    ///
    /// Deletes cancel earlier upserts and are then dropped, since a
    /// compacted journal starts from nothing. Instances keep the position of
    /// their first appearance. Returns `None` for an empty input.
    #[must_use]
    pub fn compact(batches: &[CommitBatch]) -> Option<CommitBatch> {
        let last = batches.last()?.sequence;
        let mut order: Vec<ObjectId> = Vec::new();
        let mut seen = HashSet::new();
        let mut latest: HashMap<ObjectId, &ChangeRecord> = HashMap::new();

        for change in batches.iter().flat_map(|b| &b.changes) {
            match change {
                ChangeRecord::Upsert { id, .. } => {
                    latest.insert(*id, change);
                    if seen.insert(*id) {
                        order.push(*id);
                    }
                }
                ChangeRecord::Delete { id, .. } => {
                    latest.remove(id);
                }
            }
        }

        let changes = order
            .into_iter()
            .filter_map(|id| latest.get(&id).map(|c| (*c).clone()))
            .collect();
        Some(CommitBatch {
            sequence: last,
            changes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upsert(id: ObjectId, name: &str) -> ChangeRecord {
        let mut attributes = BTreeMap::new();
        attributes.insert("name".to_string(), Value::from(name));
        let mut relationships = BTreeMap::new();
        relationships.insert("department".to_string(), RelationValue::One(None));
        ChangeRecord::Upsert {
            id,
            entity: "Person".into(),
            attributes,
            relationships,
        }
    }

    #[test]
    fn encode_decode() {
        let mut batch = CommitBatch::new(CommitSequence::new(3));
        let id = ObjectId::new();
        batch.changes.push(upsert(id, "Ahmed"));
        batch.changes.push(ChangeRecord::Delete {
            id: ObjectId::new(),
            entity: "Person".into(),
        });

        let decoded = CommitBatch::decode(&batch.encode().unwrap()).unwrap();
        assert_eq!(decoded, batch);
        assert_eq!(decoded.changes[0].id(), id);
        assert_eq!(decoded.changes[1].entity(), "Person");
    }

    #[test]
    fn decode_garbage_fails() {
        assert!(matches!(
            CommitBatch::decode(&[0xff, 0x00, 0x13]),
            Err(CoreError::Codec { .. })
        ));
    }

    #[test]
    fn compact_keeps_final_state() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let c = ObjectId::new();
        let batches = vec![
            CommitBatch {
                sequence: CommitSequence::new(1),
                changes: vec![upsert(a, "a1"), upsert(b, "b1"), upsert(c, "c1")],
            },
            CommitBatch {
                sequence: CommitSequence::new(2),
                changes: vec![
                    upsert(a, "a2"),
                    ChangeRecord::Delete {
                        id: b,
                        entity: "Person".into(),
                    },
                ],
            },
        ];

        let compacted = CommitBatch::compact(&batches).unwrap();
        assert_eq!(compacted.sequence, CommitSequence::new(2));
        assert_eq!(compacted.changes, vec![upsert(a, "a2"), upsert(c, "c1")]);
        assert!(CommitBatch::compact(&[]).is_none());
    }
}
