//! Entity instances.

use crate::schema::EntityDescriptor;
use crate::types::ObjectId;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Where an instance stands relative to the last commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Built but not yet placed in a context.
    Transient,
    /// Inserted since the last commit.
    Inserted,
    /// Unchanged since the last commit.
    Clean,
    /// Committed before, changed since.
    Updated,
    /// Destroyed; purged at the next commit.
    Deleted,
}

/// The content of a relationship slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationValue {
    /// A to-one relationship.
    One(Option<ObjectId>),
    /// A to-many relationship.
    Many(Vec<ObjectId>),
}

impl RelationValue {
    /// Returns the related identities.
    #[must_use]
    pub fn members(&self) -> &[ObjectId] {
        match self {
            Self::One(Some(id)) => std::slice::from_ref(id),
            Self::One(None) => &[],
            Self::Many(ids) => ids,
        }
    }

    /// Returns true if `id` is related.
    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.members().contains(id)
    }

    /// Returns true if nothing is related.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members().is_empty()
    }

    /// Adds `id`; returns false if it was already present.
    pub(crate) fn attach(&mut self, id: ObjectId) -> bool {
        match self {
            Self::One(slot) => slot.replace(id) != Some(id),
            Self::Many(ids) => {
                if ids.contains(&id) {
                    false
                } else {
                    ids.push(id);
                    true
                }
            }
        }
    }

    /// Removes `id`; returns false if it was absent.
    pub(crate) fn detach(&mut self, id: &ObjectId) -> bool {
        match self {
            Self::One(slot) if slot.as_ref() == Some(id) => {
                *slot = None;
                true
            }
            Self::One(_) => false,
            Self::Many(ids) => {
                let before = ids.len();
                ids.retain(|m| m != id);
                ids.len() != before
            }
        }
    }

    /// Membership equality; order matters only when `ordered`.
    fn same_members(&self, other: &Self, ordered: bool) -> bool {
        match (self, other) {
            (Self::Many(a), Self::Many(b)) if !ordered => {
                a.len() == b.len() && a.iter().all(|id| b.contains(id))
            }
            _ => self == other,
        }
    }
}

/// One entity instance.
///
/// Instances returned by a [`crate::Context`] are snapshots: they reflect the
/// working graph at the time of the call and are not updated afterwards.
#[derive(Debug, Clone)]
pub struct Instance {
    id: ObjectId,
    descriptor: Arc<EntityDescriptor>,
    attributes: BTreeMap<String, Value>,
    relationships: BTreeMap<String, RelationValue>,
    lifecycle: Lifecycle,
    persisted: bool,
    seq: u64,
}

impl Instance {
    /// Creates a transient instance with every attribute at its default.
    pub(crate) fn transient(id: ObjectId, descriptor: Arc<EntityDescriptor>) -> Self {
        let attributes = descriptor
            .attributes()
            .iter()
            .map(|a| {
                let value = if a.optional {
                    Value::Null
                } else {
                    a.scalar_type.default_value()
                };
                (a.name.clone(), value)
            })
            .collect();
        let relationships = descriptor
            .relationships()
            .iter()
            .map(|r| {
                let empty = if r.is_to_many() {
                    RelationValue::Many(Vec::new())
                } else {
                    RelationValue::One(None)
                };
                (r.name.clone(), empty)
            })
            .collect();
        Self {
            id,
            descriptor,
            attributes,
            relationships,
            lifecycle: Lifecycle::Transient,
            persisted: false,
            seq: 0,
        }
    }

    /// Returns the identity.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Returns the entity name.
    #[must_use]
    pub fn entity(&self) -> &str {
        self.descriptor.name()
    }

    /// Returns the entity descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &Arc<EntityDescriptor> {
        &self.descriptor
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Returns all attribute values.
    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// Returns a relationship slot.
    #[must_use]
    pub fn relation(&self, key: &str) -> Option<&RelationValue> {
        self.relationships.get(key)
    }

    /// Returns all relationship slots.
    #[must_use]
    pub fn relations(&self) -> &BTreeMap<String, RelationValue> {
        &self.relationships
    }

    /// Returns the identities related through `key` (empty if unknown).
    #[must_use]
    pub fn related_ids(&self, key: &str) -> &[ObjectId] {
        self.relationships.get(key).map_or(&[], RelationValue::members)
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Returns true if inserted since the last commit.
    #[must_use]
    pub fn is_inserted(&self) -> bool {
        self.lifecycle == Lifecycle::Inserted
    }

    /// Returns true if changed since the last commit.
    #[must_use]
    pub fn is_updated(&self) -> bool {
        self.lifecycle == Lifecycle::Updated
    }

    /// Returns true if destroyed.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.lifecycle == Lifecycle::Deleted
    }

    /// Returns true if a committed version of this instance exists.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Returns true if the instance has changes the next commit would write.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        match self.lifecycle {
            Lifecycle::Inserted | Lifecycle::Updated => true,
            Lifecycle::Deleted => self.persisted,
            Lifecycle::Transient | Lifecycle::Clean => false,
        }
    }

    pub(crate) fn seq(&self) -> u64 {
        self.seq
    }

    pub(crate) fn set_seq(&mut self, seq: u64) {
        self.seq = seq;
    }

    pub(crate) fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }

    pub(crate) fn set_persisted(&mut self, persisted: bool) {
        self.persisted = persisted;
    }

    /// Records a mutation: clean instances become updated.
    pub(crate) fn touch(&mut self) {
        if self.lifecycle == Lifecycle::Clean {
            self.lifecycle = Lifecycle::Updated;
        }
    }

    /// Stores an already type-checked attribute value.
    pub(crate) fn put(&mut self, key: &str, value: Value) {
        let changed = self.attributes.get(key) != Some(&value);
        if changed {
            self.attributes.insert(key.to_string(), value);
            self.touch();
        }
    }

    pub(crate) fn relation_mut(&mut self, key: &str) -> Option<&mut RelationValue> {
        self.relationships.get_mut(key)
    }

    pub(crate) fn replace_attributes(&mut self, attributes: BTreeMap<String, Value>) {
        self.attributes = attributes;
    }

    /// Returns true if attributes and relationship membership equal `other`'s.
    pub(crate) fn same_content(&self, other: &Self) -> bool {
        if self.attributes != other.attributes {
            return false;
        }
        self.descriptor.relationships().iter().all(|rel| {
            match (self.relationships.get(&rel.name), other.relationships.get(&rel.name)) {
                (Some(a), Some(b)) => a.same_members(b, rel.ordered),
                (a, b) => a == b,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RelationshipDescriptor;
    use crate::value::ScalarType;

    fn descriptor() -> Arc<EntityDescriptor> {
        Arc::new(
            EntityDescriptor::builder("Person")
                .attribute("name", ScalarType::Text)
                .attribute("age", ScalarType::Integer)
                .optional_attribute("email", ScalarType::Text)
                .relationship(RelationshipDescriptor::to_one("department", "Department"))
                .relationship(RelationshipDescriptor::to_many("friends", "Person"))
                .build(),
        )
    }

    #[test]
    fn transient_has_defaults() {
        let instance = Instance::transient(ObjectId::new(), descriptor());
        assert_eq!(instance.get("name"), Some(&Value::Text(String::new())));
        assert_eq!(instance.get("age"), Some(&Value::Integer(0)));
        assert_eq!(instance.get("email"), Some(&Value::Null));
        assert_eq!(instance.relation("department"), Some(&RelationValue::One(None)));
        assert!(instance.related_ids("friends").is_empty());
        assert_eq!(instance.lifecycle(), Lifecycle::Transient);
        assert!(!instance.has_changes());
    }

    #[test]
    fn put_touches_clean_instances_only_on_change() {
        let mut instance = Instance::transient(ObjectId::new(), descriptor());
        instance.set_lifecycle(Lifecycle::Clean);

        instance.put("age", Value::Integer(0));
        assert_eq!(instance.lifecycle(), Lifecycle::Clean);

        instance.put("age", Value::Integer(30));
        assert!(instance.is_updated());
    }

    #[test]
    fn inserted_stays_inserted() {
        let mut instance = Instance::transient(ObjectId::new(), descriptor());
        instance.set_lifecycle(Lifecycle::Inserted);
        instance.put("name", Value::from("Ahmed"));
        assert!(instance.is_inserted());
    }

    #[test]
    fn deleted_unpersisted_has_no_changes() {
        let mut instance = Instance::transient(ObjectId::new(), descriptor());
        instance.set_lifecycle(Lifecycle::Deleted);
        assert!(!instance.has_changes());
        instance.set_persisted(true);
        assert!(instance.has_changes());
    }

    #[test]
    fn relation_value_set_semantics() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let mut many = RelationValue::Many(Vec::new());
        assert!(many.attach(a));
        assert!(!many.attach(a));
        assert!(many.attach(b));
        assert_eq!(many.members(), &[a, b]);
        assert!(many.detach(&a));
        assert!(!many.detach(&a));

        let mut one = RelationValue::One(None);
        assert!(one.attach(a));
        assert!(!one.attach(a));
        assert!(!one.detach(&b));
        assert!(one.detach(&a));
        assert!(one.is_empty());
    }

    #[test]
    fn same_content_ignores_unordered_member_order() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let mut left = Instance::transient(ObjectId::new(), descriptor());
        let mut right = left.clone();
        left.relation_mut("friends").unwrap().attach(a);
        left.relation_mut("friends").unwrap().attach(b);
        right.relation_mut("friends").unwrap().attach(b);
        right.relation_mut("friends").unwrap().attach(a);
        assert!(left.same_content(&right));

        right.put("age", Value::Integer(1));
        assert!(!left.same_content(&right));
    }
}
