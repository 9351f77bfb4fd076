//! # EntiGraph Core
//!
//! Embedded object persistence for EntiGraph.
//!
//! This crate provides:
//! - An entity registry holding the schema (attributes, relationships,
//!   delete rules, inheritance)
//! - An in-memory object graph with per-instance change tracking
//! - Relationship integrity: inverse maintenance and cascade/nullify/deny
//!   delete rules
//! - A small predicate language and a query executor over it
//! - A [`Context`] that commits pending changes atomically to a journal and
//!   replays them on open

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod context;
mod error;
mod graph;
mod journal;
mod predicate;
mod query;
mod relationship;
mod schema;
mod snapshot;
mod types;
mod value;
mod values;

pub use config::Config;
pub use context::Context;
pub use error::{CoreError, CoreResult};
pub use graph::{Instance, Lifecycle, PendingChanges, RelationValue};
pub use journal::{ChangeRecord, CommitBatch};
pub use predicate::{CompareOp, Predicate, TextOp};
pub use query::{Aggregate, FetchRequest, ResultType, SortDescriptor, UpdateResult};
pub use schema::{
    AttributeDescriptor, Cardinality, DeleteRule, EntityDescriptor, EntityDescriptorBuilder, Key,
    EntityRegistry, RelationshipDescriptor,
};
pub use snapshot::Snapshot;
pub use types::{CommitSequence, ObjectId};
pub use value::{ScalarType, Value};
pub use values::{FieldValue, Values};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
