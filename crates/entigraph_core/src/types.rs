//! Identity and sequencing types.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of an instance.
///
/// Object IDs are 128-bit UUIDs assigned when an instance is inserted into a
/// context. They are never reused and survive save and reopen.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId([u8; 16]);

impl ObjectId {
    /// Creates a new random object ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().into_bytes())
    }

    /// Creates an object ID from raw bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Converts to a UUID.
    #[must_use]
    pub fn to_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.0)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_uuid())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uuid())
    }
}

/// Sequence number of a committed batch.
///
/// Higher numbers are later commits. Zero means nothing has been committed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CommitSequence(pub u64);

impl CommitSequence {
    /// Creates a sequence number.
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next sequence number.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for CommitSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_ids_are_unique() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn object_id_bytes_roundtrip() {
        let id = ObjectId::new();
        assert_eq!(ObjectId::from_bytes(*id.as_bytes()), id);
        assert_eq!(id.to_string(), id.to_uuid().to_string());
    }

    #[test]
    fn commit_sequence_next() {
        let s = CommitSequence::new(5);
        assert_eq!(s.next().as_u64(), 6);
        assert_eq!(format!("{}", s), "seq:5");
        assert!(CommitSequence::default() < s);
    }
}
