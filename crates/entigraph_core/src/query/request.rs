//! Fetch request types.

use crate::error::CoreResult;
use crate::graph::Instance;
use crate::predicate::Predicate;
use crate::value::Value;

/// One sort rule: a key and a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortDescriptor {
    /// Attribute to sort by.
    pub key: String,
    /// Ascending when true.
    pub ascending: bool,
}

impl SortDescriptor {
    /// Sorts by `key`, smallest first.
    pub fn ascending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ascending: true,
        }
    }

    /// Sorts by `key`, largest first.
    pub fn descending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ascending: false,
        }
    }
}

/// What to fetch and how to shape the result.
///
/// # Example
///
/// ```rust
/// use entigraph_core::{FetchRequest, SortDescriptor, Value};
///
/// let request = FetchRequest::new("Person")
///     .matching("age < %@", &[Value::from(30)])
///     .unwrap()
///     .sort_by(SortDescriptor::descending("age"))
///     .limit(10);
/// assert_eq!(request.limit, Some(10));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    /// Entity to fetch; sub-entities are included.
    pub entity: String,
    /// Filter; `None` matches everything.
    pub predicate: Option<Predicate>,
    /// Sort rules, applied in order as tie-breakers.
    pub sort: Vec<SortDescriptor>,
    /// Maximum number of results.
    pub limit: Option<usize>,
    /// Number of leading results to skip, after sorting.
    pub offset: usize,
    /// Evaluation batch size hint; 0 uses the context default.
    pub batch_size: usize,
}

impl FetchRequest {
    /// Fetches every live instance of `entity`.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            predicate: None,
            sort: Vec::new(),
            limit: None,
            offset: 0,
            batch_size: 0,
        }
    }

    /// Adds a filter, ANDed with any existing one.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Parses `source` and adds it as a filter.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPredicate` if the source does not parse.
    pub fn matching(self, source: &str, args: &[Value]) -> CoreResult<Self> {
        Ok(self.filter(Predicate::parse(source, args)?))
    }

    /// Appends a sort rule.
    #[must_use]
    pub fn sort_by(mut self, sort: SortDescriptor) -> Self {
        self.sort.push(sort);
        self
    }

    /// Caps the number of results.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips leading results.
    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Sets the batch size hint.
    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// What a bulk update reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultType {
    /// Only the number of updated instances.
    #[default]
    UpdatedCount,
    /// The updated instances themselves.
    UpdatedObjects,
}

/// Result of a bulk update.
#[derive(Debug, Clone)]
pub enum UpdateResult {
    /// Number of updated instances.
    Count(usize),
    /// The updated instances, in fetch order.
    Instances(Vec<Instance>),
}

impl UpdateResult {
    /// Returns the number of updated instances.
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Count(n) => *n,
            Self::Instances(instances) => instances.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let request = FetchRequest::new("Person");
        assert_eq!(request.entity, "Person");
        assert!(request.predicate.is_none());
        assert!(request.sort.is_empty());
        assert_eq!(request.limit, None);
        assert_eq!(request.offset, 0);
        assert_eq!(request.batch_size, 0);
    }

    #[test]
    fn filters_accumulate() {
        let request = FetchRequest::new("Person")
            .filter(Predicate::eq("name", "Ahmed"))
            .matching("age < 30", &[])
            .unwrap();
        assert_eq!(request.predicate.unwrap().keys(), ["name", "age"]);
    }

    #[test]
    fn matching_rejects_bad_source() {
        assert!(FetchRequest::new("Person").matching("age <", &[]).is_err());
    }

    #[test]
    fn update_result_count() {
        assert_eq!(UpdateResult::Count(3).count(), 3);
        assert_eq!(UpdateResult::Instances(Vec::new()).count(), 0);
    }
}
