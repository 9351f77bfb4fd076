//! The table of instances behind a context.

use crate::error::{CoreError, CoreResult};
use crate::graph::instance::{Instance, Lifecycle};
use crate::schema::EntityRegistry;
use crate::types::ObjectId;
use std::collections::HashMap;

/// Counts of pending changes, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingChanges {
    /// Instances inserted since the last commit.
    pub inserted: usize,
    /// Committed instances changed since the last commit.
    pub updated: usize,
    /// Committed instances destroyed since the last commit.
    pub deleted: usize,
}

impl PendingChanges {
    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inserted == 0 && self.updated == 0 && self.deleted == 0
    }

    /// Returns the total number of pending changes.
    #[must_use]
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

/// Instances keyed by identity.
///
/// The same structure serves as the working graph and as the committed
/// snapshot. Deleted instances stay in the table until [`Self::settled`]
/// purges them.
#[derive(Debug, Clone, Default)]
pub(crate) struct ObjectGraph {
    instances: HashMap<ObjectId, Instance>,
    next_seq: u64,
}

impl ObjectGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Places a transient instance in the graph as inserted.
    pub(crate) fn insert(&mut self, mut instance: Instance) -> ObjectId {
        instance.set_lifecycle(Lifecycle::Inserted);
        self.place(instance)
    }

    /// Places an instance keeping its lifecycle, assigning the next position.
    pub(crate) fn place(&mut self, mut instance: Instance) -> ObjectId {
        let id = instance.id();
        let seq = match self.instances.get(&id) {
            Some(existing) => existing.seq(),
            None => {
                self.next_seq += 1;
                self.next_seq
            }
        };
        instance.set_seq(seq);
        self.instances.insert(id, instance);
        id
    }

    pub(crate) fn get(&self, id: &ObjectId) -> Option<&Instance> {
        self.instances.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &ObjectId) -> Option<&mut Instance> {
        self.instances.get_mut(id)
    }

    /// Returns a live (not deleted) instance.
    pub(crate) fn live(&self, id: &ObjectId) -> CoreResult<&Instance> {
        self.instances
            .get(id)
            .filter(|i| !i.is_deleted())
            .ok_or_else(|| CoreError::instance_not_found(id))
    }

    pub(crate) fn live_mut(&mut self, id: &ObjectId) -> CoreResult<&mut Instance> {
        self.instances
            .get_mut(id)
            .filter(|i| !i.is_deleted())
            .ok_or_else(|| CoreError::instance_not_found(id))
    }

    pub(crate) fn is_live(&self, id: &ObjectId) -> bool {
        self.instances.get(id).is_some_and(|i| !i.is_deleted())
    }

    pub(crate) fn remove(&mut self, id: &ObjectId) -> Option<Instance> {
        self.instances.remove(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns every instance in insertion order.
    pub(crate) fn ordered(&self) -> Vec<&Instance> {
        let mut all: Vec<_> = self.instances.values().collect();
        all.sort_by_key(|i| i.seq());
        all
    }

    /// Returns live instances of `entity` or its sub-entities, in insertion order.
    pub(crate) fn live_of_kind(&self, registry: &EntityRegistry, entity: &str) -> Vec<&Instance> {
        let mut matching: Vec<_> = self
            .instances
            .values()
            .filter(|i| !i.is_deleted() && registry.is_kind_of(i.entity(), entity))
            .collect();
        matching.sort_by_key(|i| i.seq());
        matching
    }

    /// Returns the instances the next commit would write, in insertion order.
    pub(crate) fn changed(&self) -> Vec<&Instance> {
        let mut changed: Vec<_> = self.instances.values().filter(|i| i.has_changes()).collect();
        changed.sort_by_key(|i| i.seq());
        changed
    }

    pub(crate) fn pending(&self) -> PendingChanges {
        let mut pending = PendingChanges::default();
        for instance in self.instances.values().filter(|i| i.has_changes()) {
            match instance.lifecycle() {
                Lifecycle::Inserted => pending.inserted += 1,
                Lifecycle::Updated => pending.updated += 1,
                Lifecycle::Deleted => pending.deleted += 1,
                Lifecycle::Transient | Lifecycle::Clean => {}
            }
        }
        pending
    }

    /// Drops deleted instances that were never committed.
    pub(crate) fn purge_deleted(&mut self) {
        self.instances.retain(|_, i| !i.is_deleted());
    }

    /// Returns the graph as it stands once committed: deleted instances
    /// purged, everything else clean and persisted.
    pub(crate) fn settled(&self) -> Self {
        let instances = self
            .instances
            .iter()
            .filter(|(_, i)| !i.is_deleted())
            .map(|(id, i)| {
                let mut i = i.clone();
                i.set_lifecycle(Lifecycle::Clean);
                i.set_persisted(true);
                (*id, i)
            })
            .collect();
        Self {
            instances,
            next_seq: self.next_seq,
        }
    }
}
