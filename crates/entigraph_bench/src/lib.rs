//! Benchmark utilities shared by the EntiGraph benches.

use entigraph_core::{
    CoreResult, DeleteRule, EntityDescriptor, EntityRegistry, RelationshipDescriptor, ScalarType,
    Values,
};
use rand::Rng;

/// Generate random payload bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// `Department` owning a cascading to-many of `Employee`.
pub fn bench_registry() -> CoreResult<EntityRegistry> {
    let mut registry = EntityRegistry::new();
    registry.register(
        EntityDescriptor::builder("Department")
            .attribute("name", ScalarType::Text)
            .relationship(
                RelationshipDescriptor::to_many("employees", "Employee")
                    .inverse("department")
                    .delete_rule(DeleteRule::Cascade),
            )
            .build(),
    )?;
    registry.register(
        EntityDescriptor::builder("Employee")
            .attribute("name", ScalarType::Text)
            .attribute("salary", ScalarType::Integer)
            .relationship(
                RelationshipDescriptor::to_one("department", "Department").inverse("employees"),
            )
            .build(),
    )?;
    Ok(registry)
}

/// Generate employee values with random salaries.
pub fn random_employees(count: usize) -> Vec<Values> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            Values::new()
                .set("name", format!("employee-{i}"))
                .set("salary", rng.gen_range(1_000..10_000i64))
        })
        .collect()
}
