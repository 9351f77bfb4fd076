//! Sample schemas and context helpers.
//!
//! Provides the registries the integration tests share, plus wrappers that
//! open a context over memory or a temporary journal file.

use entigraph_core::{
    Config, Context, DeleteRule, EntityDescriptor, EntityRegistry, RelationshipDescriptor,
    ScalarType, Values,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// File name used for journals created by [`TestContext::file`].
pub const JOURNAL_FILE: &str = "graph.journal";

/// A test context with automatic cleanup.
pub struct TestContext {
    /// The context instance.
    pub ctx: Context,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestContext {
    /// Creates a context whose journal lives in memory.
    pub fn memory(registry: EntityRegistry) -> Self {
        Self {
            ctx: Context::in_memory(registry).expect("Failed to open in-memory context"),
            temp_dir: None,
        }
    }

    /// Creates a context over a journal file in a fresh temporary directory.
    pub fn file(registry: EntityRegistry) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join(JOURNAL_FILE);
        let ctx = Context::open(&path, registry, Config::default())
            .expect("Failed to open file context");

        Self {
            ctx,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the journal path if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.temp_dir.as_ref().map(|d| d.path().join(JOURNAL_FILE))
    }

    /// Closes the context and opens a new one over the same journal file.
    ///
    /// # Panics
    ///
    /// Panics if the context is in-memory.
    pub fn reopen(self, registry: EntityRegistry) -> Self {
        let temp_dir = self.temp_dir.expect("Only file contexts can be reopened");
        drop(self.ctx);
        let path = temp_dir.path().join(JOURNAL_FILE);
        let ctx = Context::open(&path, registry, Config::default())
            .expect("Failed to reopen file context");

        Self {
            ctx,
            temp_dir: Some(temp_dir),
        }
    }
}

impl std::ops::Deref for TestContext {
    type Target = Context;

    fn deref(&self) -> &Self::Target {
        &self.ctx
    }
}

/// Runs a test with a temporary in-memory context.
///
/// # Example
///
/// ```rust,ignore
/// use entigraph_testkit::{people_registry, with_temp_context};
///
/// #[test]
/// fn my_test() {
///     with_temp_context(people_registry(), |ctx| {
///         assert!(!ctx.has_changes());
///     });
/// }
/// ```
pub fn with_temp_context<F, R>(registry: EntityRegistry, f: F) -> R
where
    F: FnOnce(&Context) -> R,
{
    let test_ctx = TestContext::memory(registry);
    f(&test_ctx.ctx)
}

/// Runs a test with a context backed by a temporary journal file.
pub fn with_file_context<F, R>(registry: EntityRegistry, f: F) -> R
where
    F: FnOnce(&Context, &Path) -> R,
{
    let test_ctx = TestContext::file(registry);
    let path = test_ctx.path().expect("File context should have a path");
    f(&test_ctx.ctx, &path)
}

fn registry_of(descriptors: Vec<EntityDescriptor>) -> EntityRegistry {
    let mut registry = EntityRegistry::new();
    for descriptor in descriptors {
        registry
            .register(descriptor)
            .expect("Failed to register fixture entity");
    }
    registry
}

/// `Person { name, age, email? }` with `email` as its unique key.
pub fn people_registry() -> EntityRegistry {
    registry_of(vec![EntityDescriptor::builder("Person")
        .attribute("name", ScalarType::Text)
        .attribute("age", ScalarType::Integer)
        .optional_attribute("email", ScalarType::Text)
        .unique_key("email")
        .build()])
}

/// Values for a `Person` with the given name and age.
pub fn person(name: &str, age: i64) -> Values {
    Values::new().set("name", name).set("age", age)
}

/// Departments, employees and teams.
///
/// - `Department.employees` cascades to its employees
/// - `Employee.department` nullifies, dropping the employee from the list
/// - `Team.members` denies while any member is live
/// - `Employee.mentees` is an ordered to-many with a to-one inverse `mentor`
pub fn company_registry() -> EntityRegistry {
    registry_of(vec![
        EntityDescriptor::builder("Department")
            .attribute("name", ScalarType::Text)
            .unique_key("name")
            .relationship(
                RelationshipDescriptor::to_many("employees", "Employee")
                    .inverse("department")
                    .delete_rule(DeleteRule::Cascade),
            )
            .build(),
        EntityDescriptor::builder("Team")
            .attribute("name", ScalarType::Text)
            .relationship(
                RelationshipDescriptor::to_many("members", "Employee")
                    .inverse("team")
                    .delete_rule(DeleteRule::Deny),
            )
            .build(),
        EntityDescriptor::builder("Employee")
            .attribute("name", ScalarType::Text)
            .attribute("salary", ScalarType::Integer)
            .optional_attribute("title", ScalarType::Text)
            .relationship(
                RelationshipDescriptor::to_one("department", "Department").inverse("employees"),
            )
            .relationship(RelationshipDescriptor::to_one("team", "Team").inverse("members"))
            .relationship(
                RelationshipDescriptor::to_many("mentees", "Employee")
                    .inverse("mentor")
                    .ordered(),
            )
            .relationship(RelationshipDescriptor::to_one("mentor", "Employee").inverse("mentees"))
            .build(),
    ])
}

/// Values for an `Employee` with the given name and salary.
pub fn employee(name: &str, salary: i64) -> Values {
    Values::new().set("name", name).set("salary", salary)
}

/// `Node { label, next, prev }` where both directions cascade.
///
/// Any chain of nodes, including a closed ring, is destroyed as a whole.
pub fn ring_registry() -> EntityRegistry {
    registry_of(vec![EntityDescriptor::builder("Node")
        .attribute("label", ScalarType::Text)
        .relationship(
            RelationshipDescriptor::to_one("next", "Node")
                .inverse("prev")
                .delete_rule(DeleteRule::Cascade),
        )
        .relationship(
            RelationshipDescriptor::to_one("prev", "Node")
                .inverse("next")
                .delete_rule(DeleteRule::Cascade),
        )
        .build()])
}

/// `Owner` holding `Animal`s, with `Dog` and `Cat` extending `Animal`.
pub fn zoo_registry() -> EntityRegistry {
    registry_of(vec![
        EntityDescriptor::builder("Owner")
            .attribute("name", ScalarType::Text)
            .relationship(RelationshipDescriptor::to_many("pets", "Animal").inverse("owner"))
            .build(),
        EntityDescriptor::builder("Animal")
            .attribute("name", ScalarType::Text)
            .optional_attribute("born", ScalarType::Timestamp)
            .relationship(RelationshipDescriptor::to_one("owner", "Owner").inverse("pets"))
            .build(),
        EntityDescriptor::builder("Dog")
            .extends("Animal")
            .attribute("breed", ScalarType::Text)
            .build(),
        EntityDescriptor::builder("Cat")
            .extends("Animal")
            .attribute("indoor", ScalarType::Bool)
            .build(),
    ])
}

/// `Tag { label }` referenced by `Note.tags` without an inverse.
pub fn notes_registry() -> EntityRegistry {
    registry_of(vec![
        EntityDescriptor::builder("Tag")
            .attribute("label", ScalarType::Text)
            .build(),
        EntityDescriptor::builder("Note")
            .attribute("body", ScalarType::Text)
            .relationship(RelationshipDescriptor::to_many("tags", "Tag"))
            .build(),
    ])
}

/// Context helpers that seed common data.
pub mod scenarios {
    use super::*;
    use entigraph_core::{Instance, ObjectId};

    /// Creates and saves one department holding `count` employees.
    ///
    /// Returns the department and the employee ids in creation order.
    pub fn staffed_department(ctx: &Context, count: usize) -> (Instance, Vec<ObjectId>) {
        let department = ctx
            .create("Department", Values::new().set("name", "Engineering"))
            .expect("Failed to create department");

        let sets = (0..count)
            .map(|i| {
                employee(&format!("employee-{i}"), 1_000 + i as i64)
                    .relate("department", department.id())
            })
            .collect();
        let employees = ctx
            .bulk_create("Employee", sets)
            .expect("Failed to create employees");
        ctx.save().expect("Failed to save department");

        let department = ctx
            .find_by_id(department.id())
            .expect("Department should exist");
        (department, employees.iter().map(Instance::id).collect())
    }

    /// Creates and saves one `Person` per `(name, age)` pair.
    pub fn populated_people(ctx: &Context, people: &[(&str, i64)]) -> Vec<ObjectId> {
        let ids = people
            .iter()
            .map(|(name, age)| {
                ctx.create("Person", person(name, *age))
                    .expect("Failed to create person")
                    .id()
            })
            .collect();
        ctx.save().expect("Failed to save people");
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_registries_validate() {
        for registry in [
            people_registry(),
            company_registry(),
            ring_registry(),
            zoo_registry(),
            notes_registry(),
        ] {
            registry.validate().unwrap();
        }
    }

    #[test]
    fn test_memory_context() {
        let ctx = TestContext::memory(people_registry());
        assert!(ctx.path().is_none());
        assert!(!ctx.has_changes());
    }

    #[test]
    fn test_file_context_reopens() {
        let ctx = TestContext::file(people_registry());
        assert!(ctx.path().unwrap().ends_with(JOURNAL_FILE));
        scenarios::populated_people(&ctx, &[("Ahmed", 29)]);

        let ctx = ctx.reopen(people_registry());
        assert_eq!(ctx.find_all("Person").unwrap().len(), 1);
    }

    #[test]
    fn test_with_temp_context() {
        let count = with_temp_context(people_registry(), |ctx| {
            scenarios::populated_people(ctx, &[("a", 1), ("b", 2)]).len()
        });
        assert_eq!(count, 2);
    }

    #[test]
    fn test_staffed_department() {
        with_temp_context(company_registry(), |ctx| {
            let (department, employees) = scenarios::staffed_department(ctx, 3);
            assert_eq!(department.related_ids("employees"), employees.as_slice());
        });
    }
}
