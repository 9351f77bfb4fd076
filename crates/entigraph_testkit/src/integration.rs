//! Cross-crate integration test helpers.
//!
//! Provides graph-wide consistency checks and a harness that mirrors the
//! expected state of a context alongside the real one.

use entigraph_core::{Context, FetchRequest, Instance, ObjectId, Value, Values};
use std::collections::BTreeMap;

/// Walks every live instance and checks that each declared inverse holds.
///
/// Returns a description of the first asymmetric link found.
pub fn find_asymmetry(ctx: &Context) -> Option<String> {
    let registry = ctx.registry();
    for entity in registry.entity_names() {
        let instances = ctx.find_all(entity).expect("Failed to list instances");
        for owner in &instances {
            for rel in owner.descriptor().relationships() {
                let Some(inverse) = &rel.inverse else {
                    continue;
                };
                for member in owner.related_ids(&rel.name) {
                    let Some(target) = ctx.find_by_id(*member) else {
                        return Some(format!("{}.{} points at missing {member}", owner.entity(), rel.name));
                    };
                    if target.is_deleted() {
                        return Some(format!("{}.{} points at deleted {member}", owner.entity(), rel.name));
                    }
                    if !target.related_ids(inverse).contains(&owner.id()) {
                        return Some(format!(
                            "{}.{} holds {member} but {}.{inverse} lacks {}",
                            owner.entity(),
                            rel.name,
                            target.entity(),
                            owner.id()
                        ));
                    }
                }
            }
        }
    }
    None
}

/// Asserts that every declared inverse in `ctx` is symmetric.
pub fn assert_inverse_symmetry(ctx: &Context) {
    if let Some(problem) = find_asymmetry(ctx) {
        panic!("inverse symmetry violated: {problem}");
    }
}

/// A test harness that tracks the expected attributes of each instance.
pub struct IntegrationHarness {
    /// The context under test.
    pub ctx: Context,
    /// Expected attribute values, by identity.
    expected: BTreeMap<ObjectId, BTreeMap<String, Value>>,
}

impl IntegrationHarness {
    /// Creates a harness over an in-memory context.
    pub fn new(registry: entigraph_core::EntityRegistry) -> Self {
        Self {
            ctx: Context::in_memory(registry).expect("Failed to open context"),
            expected: BTreeMap::new(),
        }
    }

    /// Creates an instance and tracks its attributes.
    pub fn create(&mut self, entity: &str, values: Values) -> Instance {
        let instance = self
            .ctx
            .create(entity, values)
            .expect("Failed to create instance");
        self.expected
            .insert(instance.id(), instance.attributes().clone());
        instance
    }

    /// Updates an instance and tracks its new attributes.
    pub fn set(&mut self, id: ObjectId, values: Values) -> Instance {
        let instance = self.ctx.set(id, values).expect("Failed to set values");
        self.expected.insert(id, instance.attributes().clone());
        instance
    }

    /// Destroys an instance (and anything it cascades to) and stops tracking it.
    pub fn destroy(&mut self, id: ObjectId) {
        self.ctx.destroy(id).expect("Failed to destroy instance");
        self.expected
            .retain(|id, _| self.ctx.find_by_id(*id).is_some_and(|i| !i.is_deleted()));
    }

    /// Verifies every tracked instance against the working graph.
    pub fn verify_all(&self) {
        for (id, expected) in &self.expected {
            let actual = self
                .ctx
                .find_by_id(*id)
                .unwrap_or_else(|| panic!("Instance {id} is missing"));
            assert_eq!(actual.attributes(), expected, "Attribute mismatch for {id}");
        }
    }

    /// Verifies every tracked instance against the committed snapshot.
    pub fn verify_committed(&self) {
        let snapshot = self.ctx.snapshot();
        for (id, expected) in &self.expected {
            let actual = snapshot
                .find_by_id(id)
                .unwrap_or_else(|| panic!("Instance {id} is not committed"));
            assert_eq!(actual.attributes(), expected, "Committed mismatch for {id}");
        }
    }

    /// Returns the count of tracked instances.
    pub fn tracked_count(&self) -> usize {
        self.expected.len()
    }

    /// Counts instances of `entity` in the working graph.
    pub fn live_count(&self, entity: &str) -> usize {
        self.ctx
            .count(&FetchRequest::new(entity))
            .expect("Failed to count instances")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{company_registry, employee, people_registry, person};

    #[test]
    fn test_harness_tracks_changes() {
        let mut harness = IntegrationHarness::new(people_registry());
        let a = harness.create("Person", person("Ahmed", 29));
        harness.create("Person", person("Bea", 41));
        harness.set(a.id(), Values::new().set("age", 30));
        harness.verify_all();

        harness.ctx.save().unwrap();
        harness.verify_committed();
        assert_eq!(harness.tracked_count(), 2);

        harness.destroy(a.id());
        assert_eq!(harness.tracked_count(), 1);
        assert_eq!(harness.live_count("Person"), 1);
    }

    #[test]
    fn test_harness_forgets_cascaded_instances() {
        let mut harness = IntegrationHarness::new(company_registry());
        let department = harness.create("Department", Values::new().set("name", "Ops"));
        for i in 0..3 {
            harness.create(
                "Employee",
                employee(&format!("e{i}"), 1).relate("department", department.id()),
            );
        }
        assert_inverse_symmetry(&harness.ctx);

        harness.destroy(department.id());
        assert_eq!(harness.tracked_count(), 0);
        assert_inverse_symmetry(&harness.ctx);
    }
}
