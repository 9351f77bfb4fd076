//! Relationship integrity: inverse maintenance and delete rules.
//!
//! Every operation here works on the working graph while the caller holds
//! its write lock, so both sides of a link change within one step. Targets
//! are validated up front with [`check_value`]; linking itself cannot fail.

use crate::error::{CoreError, CoreResult};
use crate::graph::{Instance, Lifecycle, ObjectGraph, RelationValue};
use crate::schema::{DeleteRule, EntityRegistry, RelationshipDescriptor};
use crate::types::ObjectId;
use std::collections::HashSet;
use tracing::debug;

/// Checks that `value` fits `rel` of an instance of `entity`.
///
/// # Errors
///
/// - `TypeMismatch` if the value's shape does not match the cardinality, or a
///   member is not an instance of the target entity
/// - `InstanceNotFound` if a member is missing or deleted
pub(crate) fn check_value(
    graph: &ObjectGraph,
    registry: &EntityRegistry,
    entity: &str,
    rel: &RelationshipDescriptor,
    value: &RelationValue,
) -> CoreResult<()> {
    match (value, rel.is_to_many()) {
        (RelationValue::One(_), false) | (RelationValue::Many(_), true) => {}
        (RelationValue::One(_), true) => {
            return Err(CoreError::type_mismatch(entity, &rel.name, "to-many", "to-one"));
        }
        (RelationValue::Many(_), false) => {
            return Err(CoreError::type_mismatch(entity, &rel.name, "to-one", "to-many"));
        }
    }
    for member in value.members() {
        check_target(graph, registry, entity, rel, member)?;
    }
    Ok(())
}

/// Checks that `member` is a live instance of `rel`'s target entity.
pub(crate) fn check_target(
    graph: &ObjectGraph,
    registry: &EntityRegistry,
    entity: &str,
    rel: &RelationshipDescriptor,
    member: &ObjectId,
) -> CoreResult<()> {
    let instance = graph.live(member)?;
    if registry.is_kind_of(instance.entity(), &rel.target) {
        Ok(())
    } else {
        Err(CoreError::type_mismatch(
            entity,
            &rel.name,
            rel.target.as_str(),
            instance.entity(),
        ))
    }
}

/// The instances a destroy will remove, in traversal order.
#[derive(Debug, Default)]
pub(crate) struct DeletePlan {
    order: Vec<ObjectId>,
    doomed: HashSet<ObjectId>,
}

impl DeletePlan {
    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn contains(&self, id: &ObjectId) -> bool {
        self.doomed.contains(id)
    }
}

/// Resolves the cascade closure of `roots` and checks deny rules over it.
///
/// Nothing is mutated; a denied plan leaves the graph untouched.
///
/// # Errors
///
/// - `InstanceNotFound` if a root is missing or already deleted
/// - `DeleteDenied` if a deny relationship holds a live member outside the
///   closure
pub(crate) fn plan_delete(graph: &ObjectGraph, roots: &[ObjectId]) -> CoreResult<DeletePlan> {
    let mut plan = DeletePlan::default();
    let mut stack: Vec<ObjectId> = roots.iter().rev().copied().collect();

    while let Some(id) = stack.pop() {
        if !plan.doomed.insert(id) {
            continue;
        }
        let instance = graph.live(&id)?;
        plan.order.push(id);

        for rel in instance.descriptor().relationships() {
            if rel.delete_rule != DeleteRule::Cascade {
                continue;
            }
            for member in instance.related_ids(&rel.name).iter().rev() {
                if graph.is_live(member) && !plan.doomed.contains(member) {
                    stack.push(*member);
                }
            }
        }
    }

    for id in &plan.order {
        let instance = graph.live(id)?;
        for rel in instance.descriptor().relationships() {
            if rel.delete_rule != DeleteRule::Deny {
                continue;
            }
            let count = instance
                .related_ids(&rel.name)
                .iter()
                .filter(|m| graph.is_live(m) && !plan.doomed.contains(m))
                .count();
            if count > 0 {
                return Err(CoreError::DeleteDenied {
                    entity: instance.entity().to_string(),
                    relationship: rel.name.clone(),
                    count,
                });
            }
        }
    }

    debug!(roots = roots.len(), closure = plan.len(), "planned delete");
    Ok(plan)
}

/// Applies relationship changes to the working graph, both sides at once.
pub(crate) struct Integrity<'a> {
    graph: &'a mut ObjectGraph,
    registry: &'a EntityRegistry,
    touched: HashSet<ObjectId>,
}

impl<'a> Integrity<'a> {
    pub(crate) fn new(graph: &'a mut ObjectGraph, registry: &'a EntityRegistry) -> Self {
        Self {
            graph,
            registry,
            touched: HashSet::new(),
        }
    }

    /// Returns every instance whose relationships changed.
    pub(crate) fn touched(&self) -> &HashSet<ObjectId> {
        &self.touched
    }

    /// Replaces the content of `owner.name` with `value`.
    ///
    /// A to-many value replaces the whole membership and, for ordered
    /// relationships, the order.
    pub(crate) fn assign(&mut self, owner: ObjectId, name: &str, value: &RelationValue) {
        let current = self.members(&owner, name);
        match value {
            RelationValue::One(None) => {
                for member in current {
                    self.unlink(owner, name, member);
                }
            }
            RelationValue::One(Some(member)) => self.link(owner, name, *member),
            RelationValue::Many(members) => {
                for member in current.iter().filter(|m| !members.contains(m)) {
                    self.unlink(owner, name, *member);
                }
                for member in members {
                    self.link(owner, name, *member);
                }
                self.reorder(owner, name, members);
            }
        }
    }

    /// Links `member` into `owner.name`, maintaining the inverse.
    ///
    /// A to-one owner drops its previous member first. If the inverse is
    /// to-one, `member` is detached from whoever held it before.
    pub(crate) fn link(&mut self, owner: ObjectId, name: &str, member: ObjectId) {
        let Some(rel) = self.relationship(&owner, name) else {
            return;
        };
        let current = self.members(&owner, name);
        if current.contains(&member) {
            return;
        }
        if !rel.is_to_many() {
            for previous in current {
                self.unlink(owner, name, previous);
            }
        }

        if let Some(inverse_name) = &rel.inverse {
            let inverse_to_one = self
                .relationship(&member, inverse_name)
                .is_some_and(|inverse| !inverse.is_to_many());
            if inverse_to_one {
                for holder in self.members(&member, inverse_name) {
                    if holder != owner {
                        self.unlink(member, inverse_name, holder);
                    }
                }
            }
        }

        self.attach(owner, name, member);
        if let Some(inverse_name) = &rel.inverse {
            self.attach(member, inverse_name, owner);
        }
    }

    /// Removes `member` from `owner.name`, maintaining the inverse.
    pub(crate) fn unlink(&mut self, owner: ObjectId, name: &str, member: ObjectId) {
        let inverse = self.relationship(&owner, name).and_then(|r| r.inverse);
        self.detach(owner, name, &member);
        if let Some(inverse) = inverse {
            self.detach(member, &inverse, &owner);
        }
    }

    /// Marks every instance in `plan` deleted and detaches it from survivors.
    pub(crate) fn apply_delete(&mut self, plan: &DeletePlan) {
        for id in &plan.order {
            let links: Vec<(String, Vec<ObjectId>)> = match self.graph.get(id) {
                Some(instance) => instance
                    .relations()
                    .iter()
                    .map(|(name, value)| (name.clone(), value.members().to_vec()))
                    .collect(),
                None => continue,
            };
            for (name, members) in links {
                for member in members.into_iter().filter(|m| !plan.contains(m)) {
                    self.unlink(*id, &name, member);
                }
            }
        }

        if self.registry.has_one_sided_relationships() {
            self.sweep_one_sided(plan);
        }

        for id in &plan.order {
            if let Some(instance) = self.graph.get_mut(id) {
                instance.set_lifecycle(Lifecycle::Deleted);
            }
        }
        debug!(count = plan.len(), "destroyed instances");
    }

    /// Restores `id` to its committed content, repairing inverse sides.
    ///
    /// Committed members that are no longer live are left out.
    pub(crate) fn restore(&mut self, id: ObjectId, committed: &Instance) {
        let Some(instance) = self.graph.get_mut(&id) else {
            return;
        };
        if instance.is_deleted() {
            instance.set_lifecycle(Lifecycle::Updated);
        }
        instance.replace_attributes(committed.attributes().clone());
        self.touched.insert(id);

        let relationships: Vec<_> = committed
            .descriptor()
            .relationships()
            .iter()
            .map(|rel| (rel.name.clone(), rel.is_to_many()))
            .collect();
        for (name, to_many) in relationships {
            let members: Vec<ObjectId> = committed
                .related_ids(&name)
                .iter()
                .copied()
                .filter(|m| self.graph.is_live(m))
                .collect();
            let value = if to_many {
                RelationValue::Many(members)
            } else {
                RelationValue::One(members.first().copied())
            };
            self.assign(id, &name, &value);
        }
    }

    fn sweep_one_sided(&mut self, plan: &DeletePlan) {
        let mut dangling = Vec::new();
        for instance in self.graph.ordered() {
            if instance.is_deleted() || plan.contains(&instance.id()) {
                continue;
            }
            for rel in instance.descriptor().relationships() {
                if rel.inverse.is_some() {
                    continue;
                }
                for member in instance.related_ids(&rel.name) {
                    if plan.contains(member) {
                        dangling.push((instance.id(), rel.name.clone(), *member));
                    }
                }
            }
        }
        for (owner, name, member) in dangling {
            self.detach(owner, &name, &member);
        }
    }

    fn relationship(&self, owner: &ObjectId, name: &str) -> Option<RelationshipDescriptor> {
        self.graph
            .get(owner)?
            .descriptor()
            .relationship(name)
            .cloned()
    }

    fn members(&self, owner: &ObjectId, name: &str) -> Vec<ObjectId> {
        self.graph
            .get(owner)
            .map(|i| i.related_ids(name).to_vec())
            .unwrap_or_default()
    }

    fn attach(&mut self, owner: ObjectId, name: &str, member: ObjectId) {
        if let Some(instance) = self.graph.get_mut(&owner) {
            let changed = instance
                .relation_mut(name)
                .is_some_and(|slot| slot.attach(member));
            if changed {
                instance.touch();
                self.touched.insert(owner);
            }
        }
    }

    fn detach(&mut self, owner: ObjectId, name: &str, member: &ObjectId) {
        if let Some(instance) = self.graph.get_mut(&owner) {
            let changed = instance
                .relation_mut(name)
                .is_some_and(|slot| slot.detach(member));
            if changed {
                instance.touch();
                self.touched.insert(owner);
            }
        }
    }

    fn reorder(&mut self, owner: ObjectId, name: &str, order: &[ObjectId]) {
        let Some(instance) = self.graph.get_mut(&owner) else {
            return;
        };
        let changed = match instance.relation_mut(name) {
            Some(RelationValue::Many(ids)) => {
                let before = ids.clone();
                ids.sort_by_key(|id| order.iter().position(|m| m == id).unwrap_or(usize::MAX));
                *ids != before
            }
            _ => false,
        };
        if changed {
            instance.touch();
            self.touched.insert(owner);
        }
    }
}
