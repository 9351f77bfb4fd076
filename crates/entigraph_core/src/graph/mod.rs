//! In-memory object graph: instances and the table that holds them.

mod instance;
mod store;

pub use instance::{Instance, Lifecycle, RelationValue};
pub use store::PendingChanges;
pub(crate) use store::ObjectGraph;
