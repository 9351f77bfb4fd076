//! Entity schema: descriptors and the registry that resolves them.

mod descriptor;
mod registry;

pub use descriptor::{
    AttributeDescriptor, Cardinality, DeleteRule, EntityDescriptor, EntityDescriptorBuilder, Key,
    RelationshipDescriptor,
};
pub use registry::EntityRegistry;
