//! Fetch requests and their execution.

mod executor;
mod request;

pub use executor::Aggregate;
pub(crate) use executor::QueryExecutor;
pub use request::{FetchRequest, ResultType, SortDescriptor, UpdateResult};
