//! Values supplied to create, set, update and upsert.

use crate::graph::RelationValue;
use crate::types::ObjectId;
use crate::value::Value;

/// A value for one key: a scalar for attributes, a relation for relationships.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// An attribute value.
    Scalar(Value),
    /// A relationship value.
    Relation(RelationValue),
}

/// An ordered set of key/value assignments.
///
/// A key assigned twice keeps the later value.
///
/// # Example
///
/// ```rust
/// use entigraph_core::{ObjectId, Values};
///
/// let department = ObjectId::new();
/// let values = Values::new()
///     .set("name", "Ahmed")
///     .set("age", 29)
///     .relate("department", department);
/// assert_eq!(values.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values {
    entries: Vec<(String, FieldValue)>,
}

impl Values {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns an attribute.
    #[must_use]
    pub fn set(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(key.into(), FieldValue::Scalar(value.into()))
    }

    /// Points a to-one relationship at `id`.
    #[must_use]
    pub fn relate(self, key: impl Into<String>, id: ObjectId) -> Self {
        self.with(key.into(), FieldValue::Relation(RelationValue::One(Some(id))))
    }

    /// Clears a to-one relationship.
    #[must_use]
    pub fn unrelate(self, key: impl Into<String>) -> Self {
        self.with(key.into(), FieldValue::Relation(RelationValue::One(None)))
    }

    /// Replaces the membership of a to-many relationship.
    #[must_use]
    pub fn relate_many(self, key: impl Into<String>, ids: impl IntoIterator<Item = ObjectId>) -> Self {
        let ids = ids.into_iter().collect();
        self.with(key.into(), FieldValue::Relation(RelationValue::Many(ids)))
    }

    /// Assigns a relationship value directly.
    #[must_use]
    pub fn relation(self, key: impl Into<String>, value: RelationValue) -> Self {
        self.with(key.into(), FieldValue::Relation(value))
    }

    /// Returns the value assigned to `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Iterates over assignments in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of assigned keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn with(mut self, key: String, value: FieldValue) -> Self {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }
}

impl<K, V> FromIterator<(K, V)> for Values
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |values, (k, v)| values.set(k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_assignment_wins() {
        let values = Values::new().set("age", 1).set("name", "x").set("age", 2);
        assert_eq!(values.len(), 2);
        assert_eq!(values.get("age"), Some(&FieldValue::Scalar(Value::Integer(2))));
        let keys: Vec<_> = values.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["age", "name"]);
    }

    #[test]
    fn relation_helpers() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let values = Values::new()
            .relate("boss", a)
            .unrelate("mentor")
            .relate_many("friends", [a, b]);
        assert_eq!(
            values.get("boss"),
            Some(&FieldValue::Relation(RelationValue::One(Some(a))))
        );
        assert_eq!(
            values.get("mentor"),
            Some(&FieldValue::Relation(RelationValue::One(None)))
        );
        assert_eq!(
            values.get("friends"),
            Some(&FieldValue::Relation(RelationValue::Many(vec![a, b])))
        );
    }

    #[test]
    fn collect_from_pairs() {
        let values: Values = [("name", Value::from("Ahmed")), ("age", Value::from(29))]
            .into_iter()
            .collect();
        assert_eq!(values.len(), 2);
        assert!(Values::new().is_empty());
    }
}
