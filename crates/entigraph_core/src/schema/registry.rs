//! Entity registry.

use crate::error::{CoreError, CoreResult};
use crate::schema::descriptor::EntityDescriptor;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps entity names to their resolved descriptors.
///
/// The registry is filled during bootstrap and then shared read-only by a
/// [`crate::Context`]. Registration resolves inheritance once, so every
/// descriptor handed out already carries its inherited keys.
///
/// # Example
///
/// ```rust
/// use entigraph_core::{EntityDescriptor, EntityRegistry, ScalarType};
///
/// let mut registry = EntityRegistry::new();
/// registry
///     .register(EntityDescriptor::builder("Person").attribute("name", ScalarType::Text).build())
///     .unwrap();
/// assert!(registry.describe("Person").is_ok());
/// assert!(registry.describe("Robot").is_err());
/// ```
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: HashMap<String, Arc<EntityDescriptor>>,
    order: Vec<String>,
}

impl EntityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity.
    ///
    /// A descriptor that extends a parent must be registered after it.
    ///
    /// # Errors
    ///
    /// - `DuplicateEntity` if the name is taken
    /// - `UnknownEntity` if the parent is not registered
    /// - `InvalidSchema` if keys collide or a unique key is not an attribute
    pub fn register(&mut self, mut descriptor: EntityDescriptor) -> CoreResult<Arc<EntityDescriptor>> {
        if self.entities.contains_key(descriptor.name()) {
            return Err(CoreError::DuplicateEntity {
                name: descriptor.name().to_string(),
            });
        }

        if let Some(parent) = descriptor.parent() {
            let parent = self.describe(parent)?;
            descriptor.inherit(&parent)?;
        }
        descriptor.check_keys()?;

        let name = descriptor.name().to_string();
        let descriptor = Arc::new(descriptor);
        self.entities.insert(name.clone(), Arc::clone(&descriptor));
        self.order.push(name);
        Ok(descriptor)
    }

    /// Returns the descriptor for an entity.
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntity` if no entity has this name.
    pub fn describe(&self, name: &str) -> CoreResult<Arc<EntityDescriptor>> {
        self.entities
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::unknown_entity(name))
    }

    /// Checks if an entity is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    /// Returns entity names in registration order.
    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Returns the number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns true if `entity` is `ancestor` or extends it, directly or not.
    #[must_use]
    pub fn is_kind_of(&self, entity: &str, ancestor: &str) -> bool {
        let mut current = Some(entity);
        while let Some(name) = current {
            if name == ancestor {
                return true;
            }
            current = self.entities.get(name).and_then(|d| d.parent());
        }
        false
    }

    /// Returns true if any relationship lacks an inverse.
    ///
    /// Destroying an instance then needs a sweep for one-sided references.
    #[must_use]
    pub fn has_one_sided_relationships(&self) -> bool {
        self.entities
            .values()
            .flat_map(|d| d.relationships())
            .any(|r| r.inverse.is_none())
    }

    /// Checks cross-entity consistency of the whole schema.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` naming the first problem found:
    /// - a relationship targets an unregistered entity
    /// - a declared inverse is missing on the target
    /// - an inverse does not point back at the declaring relationship
    pub fn validate(&self) -> CoreResult<()> {
        for name in &self.order {
            let descriptor = &self.entities[name];
            for rel in descriptor.relationships() {
                let target = self.entities.get(&rel.target).ok_or_else(|| {
                    CoreError::invalid_schema(format!(
                        "{name}.{} targets unknown entity {}",
                        rel.name, rel.target
                    ))
                })?;

                let Some(inverse_name) = &rel.inverse else {
                    continue;
                };
                let inverse = target.relationship(inverse_name).ok_or_else(|| {
                    CoreError::invalid_schema(format!(
                        "{name}.{} names inverse {}.{inverse_name}, which does not exist",
                        rel.name, rel.target
                    ))
                })?;

                if !self.is_kind_of(name, &inverse.target) {
                    return Err(CoreError::invalid_schema(format!(
                        "{}.{inverse_name} targets {}, not {name}",
                        rel.target, inverse.target
                    )));
                }
                if inverse.inverse.as_deref() != Some(rel.name.as_str()) {
                    return Err(CoreError::invalid_schema(format!(
                        "{}.{inverse_name} does not name {name}.{} as its inverse",
                        rel.target, rel.name
                    )));
                }
            }
        }
        Ok(())
    }
}
