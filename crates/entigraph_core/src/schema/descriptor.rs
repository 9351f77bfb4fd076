//! Entity, attribute and relationship descriptors.

use crate::error::{CoreError, CoreResult};
use crate::value::ScalarType;

/// A scalar attribute of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDescriptor {
    /// Attribute name.
    pub name: String,
    /// Declared type.
    pub scalar_type: ScalarType,
    /// Whether the attribute may hold `Null`. Optional attributes start as `Null`.
    pub optional: bool,
}

/// How many instances a relationship can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// At most one related instance.
    ToOne,
    /// Any number of related instances.
    ToMany,
}

/// What happens to related instances when the owner is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteRule {
    /// Destroy the related instances too.
    Cascade,
    /// Remove the destroyed instance from the related instances' inverse.
    #[default]
    Nullify,
    /// Refuse the destroy while the relationship holds live instances.
    Deny,
}

/// A relationship from one entity to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipDescriptor {
    /// Relationship name.
    pub name: String,
    /// Target entity name.
    pub target: String,
    /// To-one or to-many.
    pub cardinality: Cardinality,
    /// Whether a to-many relationship keeps insertion order.
    pub ordered: bool,
    /// Name of the reciprocal relationship on the target entity.
    pub inverse: Option<String>,
    /// Delete rule applied when the owner is destroyed.
    pub delete_rule: DeleteRule,
}

impl RelationshipDescriptor {
    /// Creates a to-one relationship with the default (`Nullify`) delete rule.
    pub fn to_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            cardinality: Cardinality::ToOne,
            ordered: false,
            inverse: None,
            delete_rule: DeleteRule::default(),
        }
    }

    /// Creates an unordered to-many relationship.
    pub fn to_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            cardinality: Cardinality::ToMany,
            ..Self::to_one(name, target)
        }
    }

    /// Declares the reciprocal relationship.
    #[must_use]
    pub fn inverse(mut self, inverse: impl Into<String>) -> Self {
        self.inverse = Some(inverse.into());
        self
    }

    /// Sets the delete rule.
    #[must_use]
    pub fn delete_rule(mut self, rule: DeleteRule) -> Self {
        self.delete_rule = rule;
        self
    }

    /// Makes a to-many relationship keep insertion order.
    #[must_use]
    pub fn ordered(mut self) -> Self {
        self.ordered = true;
        self
    }

    /// Returns true for to-many relationships.
    #[must_use]
    pub fn is_to_many(&self) -> bool {
        self.cardinality == Cardinality::ToMany
    }
}

/// A key of an entity, resolved to its descriptor.
#[derive(Debug, Clone, Copy)]
pub enum Key<'a> {
    /// A scalar attribute.
    Attribute(&'a AttributeDescriptor),
    /// A relationship.
    Relationship(&'a RelationshipDescriptor),
}

/// The schema of one entity.
///
/// Descriptors are immutable once registered. Instances share them through
/// an `Arc` handed out by the [`crate::EntityRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    name: String,
    parent: Option<String>,
    attributes: Vec<AttributeDescriptor>,
    relationships: Vec<RelationshipDescriptor>,
    unique_keys: Vec<String>,
}

impl EntityDescriptor {
    /// Starts building a descriptor.
    ///
    /// # Example
    ///
    /// ```rust
    /// use entigraph_core::{EntityDescriptor, RelationshipDescriptor, ScalarType};
    ///
    /// let person = EntityDescriptor::builder("Person")
    ///     .attribute("name", ScalarType::Text)
    ///     .attribute("age", ScalarType::Integer)
    ///     .relationship(RelationshipDescriptor::to_one("department", "Department").inverse("employees"))
    ///     .build();
    /// assert_eq!(person.attributes().len(), 2);
    /// ```
    pub fn builder(name: impl Into<String>) -> EntityDescriptorBuilder {
        EntityDescriptorBuilder {
            descriptor: Self {
                name: name.into(),
                parent: None,
                attributes: Vec::new(),
                relationships: Vec::new(),
                unique_keys: Vec::new(),
            },
        }
    }

    /// Returns the entity name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parent entity name, if this entity extends another.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Returns the attributes in declaration order (inherited ones first).
    #[must_use]
    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    /// Returns the relationships in declaration order (inherited ones first).
    #[must_use]
    pub fn relationships(&self) -> &[RelationshipDescriptor] {
        &self.relationships
    }

    /// Returns the attribute names that identify an instance for upserts.
    #[must_use]
    pub fn unique_keys(&self) -> &[String] {
        &self.unique_keys
    }

    /// Looks up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Looks up a relationship by name.
    #[must_use]
    pub fn relationship(&self, name: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Resolves a key to an attribute or relationship.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKey` if the entity has no such key.
    pub fn key(&self, name: &str) -> CoreResult<Key<'_>> {
        if let Some(attribute) = self.attribute(name) {
            return Ok(Key::Attribute(attribute));
        }
        if let Some(relationship) = self.relationship(name) {
            return Ok(Key::Relationship(relationship));
        }
        Err(CoreError::unknown_key(&self.name, name))
    }

    /// Resolves a key that must be an attribute.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKey` for unknown names and `TypeMismatch` for
    /// relationship names.
    pub fn attribute_key(&self, name: &str) -> CoreResult<&AttributeDescriptor> {
        match self.key(name)? {
            Key::Attribute(attribute) => Ok(attribute),
            Key::Relationship(_) => Err(CoreError::type_mismatch(
                &self.name,
                name,
                "attribute",
                "relationship",
            )),
        }
    }

    /// Merges a parent descriptor in front of this one's own keys.
    pub(crate) fn inherit(&mut self, parent: &EntityDescriptor) -> CoreResult<()> {
        for attribute in &self.attributes {
            if parent.attribute(&attribute.name).is_some()
                || parent.relationship(&attribute.name).is_some()
            {
                return Err(CoreError::invalid_schema(format!(
                    "{} redeclares inherited key {}",
                    self.name, attribute.name
                )));
            }
        }
        for relationship in &self.relationships {
            if parent.attribute(&relationship.name).is_some()
                || parent.relationship(&relationship.name).is_some()
            {
                return Err(CoreError::invalid_schema(format!(
                    "{} redeclares inherited key {}",
                    self.name, relationship.name
                )));
            }
        }

        let mut attributes = parent.attributes.clone();
        attributes.append(&mut self.attributes);
        self.attributes = attributes;

        let mut relationships = parent.relationships.clone();
        relationships.append(&mut self.relationships);
        self.relationships = relationships;

        let mut unique_keys = parent.unique_keys.clone();
        for key in self.unique_keys.drain(..) {
            if !unique_keys.contains(&key) {
                unique_keys.push(key);
            }
        }
        self.unique_keys = unique_keys;
        Ok(())
    }

    /// Checks that no key is declared twice and unique keys name attributes.
    pub(crate) fn check_keys(&self) -> CoreResult<()> {
        let mut seen = std::collections::HashSet::new();
        let names = self
            .attributes
            .iter()
            .map(|a| a.name.as_str())
            .chain(self.relationships.iter().map(|r| r.name.as_str()));
        for name in names {
            if !seen.insert(name) {
                return Err(CoreError::invalid_schema(format!(
                    "{} declares key {name} twice",
                    self.name
                )));
            }
        }
        for key in &self.unique_keys {
            if self.attribute(key).is_none() {
                return Err(CoreError::invalid_schema(format!(
                    "{} unique key {key} is not an attribute",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Fluent builder for [`EntityDescriptor`].
#[derive(Debug, Clone)]
pub struct EntityDescriptorBuilder {
    descriptor: EntityDescriptor,
}

impl EntityDescriptorBuilder {
    /// Adds a required attribute.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, scalar_type: ScalarType) -> Self {
        self.descriptor.attributes.push(AttributeDescriptor {
            name: name.into(),
            scalar_type,
            optional: false,
        });
        self
    }

    /// Adds an optional attribute, which starts as `Null`.
    #[must_use]
    pub fn optional_attribute(mut self, name: impl Into<String>, scalar_type: ScalarType) -> Self {
        self.descriptor.attributes.push(AttributeDescriptor {
            name: name.into(),
            scalar_type,
            optional: true,
        });
        self
    }

    /// Adds a relationship.
    #[must_use]
    pub fn relationship(mut self, relationship: RelationshipDescriptor) -> Self {
        self.descriptor.relationships.push(relationship);
        self
    }

    /// Marks an attribute as part of the upsert identity.
    #[must_use]
    pub fn unique_key(mut self, name: impl Into<String>) -> Self {
        self.descriptor.unique_keys.push(name.into());
        self
    }

    /// Makes this entity extend a registered parent entity.
    #[must_use]
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.descriptor.parent = Some(parent.into());
        self
    }

    /// Finishes the descriptor.
    #[must_use]
    pub fn build(self) -> EntityDescriptor {
        self.descriptor
    }
}
