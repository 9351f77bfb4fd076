//! Read-only view of the last committed state.

use crate::error::CoreResult;
use crate::graph::{Instance, ObjectGraph};
use crate::query::{Aggregate, FetchRequest, QueryExecutor};
use crate::schema::EntityRegistry;
use crate::types::{CommitSequence, ObjectId};
use crate::value::Value;
use std::sync::Arc;

/// The committed graph as of one commit.
///
/// A snapshot never changes: later commits swap in a new graph and leave
/// existing snapshots alone.
#[derive(Debug, Clone)]
pub struct Snapshot {
    graph: Arc<ObjectGraph>,
    registry: Arc<EntityRegistry>,
    sequence: CommitSequence,
    default_batch_size: usize,
}

impl Snapshot {
    pub(crate) fn new(
        graph: Arc<ObjectGraph>,
        registry: Arc<EntityRegistry>,
        sequence: CommitSequence,
        default_batch_size: usize,
    ) -> Self {
        Self {
            graph,
            registry,
            sequence,
            default_batch_size,
        }
    }

    /// Returns the sequence of the commit this snapshot reflects.
    #[must_use]
    pub fn sequence(&self) -> CommitSequence {
        self.sequence
    }

    /// Returns the number of committed instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    /// Returns true if nothing has been committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.len() == 0
    }

    /// Looks up a committed instance.
    #[must_use]
    pub fn find_by_id(&self, id: &ObjectId) -> Option<Instance> {
        self.graph.get(id).cloned()
    }

    /// Runs a fetch request.
    ///
    /// # Errors
    ///
    /// Same as [`crate::Context::find`].
    pub fn find(&self, request: &FetchRequest) -> CoreResult<Vec<Instance>> {
        Ok(self
            .executor()
            .execute(request)?
            .into_iter()
            .cloned()
            .collect())
    }

    /// Returns the first match.
    ///
    /// # Errors
    ///
    /// Same as [`crate::Context::find`].
    pub fn find_one(&self, request: &FetchRequest) -> CoreResult<Option<Instance>> {
        Ok(self.executor().first(request)?.cloned())
    }

    /// Counts matches.
    ///
    /// # Errors
    ///
    /// Same as [`crate::Context::find`].
    pub fn count(&self, request: &FetchRequest) -> CoreResult<usize> {
        self.executor().count(request)
    }

    /// Aggregates one attribute over the matches.
    ///
    /// # Errors
    ///
    /// Same as [`crate::Context::aggregate`].
    pub fn aggregate(&self, request: &FetchRequest, function: Aggregate, key: &str) -> CoreResult<Value> {
        self.executor().aggregate(request, function, key)
    }

    fn executor(&self) -> QueryExecutor<'_> {
        QueryExecutor::new(&self.graph, &self.registry, self.default_batch_size)
    }
}
