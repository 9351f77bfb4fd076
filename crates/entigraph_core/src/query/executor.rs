//! Query execution over an object graph.

use super::request::{FetchRequest, SortDescriptor};
use crate::error::{CoreError, CoreResult};
use crate::graph::{Instance, ObjectGraph};
use crate::schema::EntityRegistry;
use crate::value::{ScalarType, Value};
use std::cmp::Ordering;

/// Aggregate functions over one attribute of the matching instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// Number of matches with a non-null value.
    Count,
    /// Sum of a numeric attribute; integers stay integers.
    Sum,
    /// Smallest non-null value.
    Min,
    /// Largest non-null value.
    Max,
    /// Mean of a numeric attribute, as a float.
    Average,
}

/// Runs fetch requests against a graph.
///
/// The same executor serves the working graph and the committed snapshot.
pub(crate) struct QueryExecutor<'a> {
    graph: &'a ObjectGraph,
    registry: &'a EntityRegistry,
    default_batch_size: usize,
}

impl<'a> QueryExecutor<'a> {
    pub(crate) fn new(
        graph: &'a ObjectGraph,
        registry: &'a EntityRegistry,
        default_batch_size: usize,
    ) -> Self {
        Self {
            graph,
            registry,
            default_batch_size,
        }
    }

    /// Returns the matching instances: filtered, sorted, then paged.
    pub(crate) fn execute(&self, request: &FetchRequest) -> CoreResult<Vec<&'a Instance>> {
        self.validate(request)?;
        let candidates = self.graph.live_of_kind(self.registry, &request.entity);

        // Without sorting the first `offset + limit` matches are final.
        let wanted = match request.limit {
            Some(limit) if request.sort.is_empty() => Some(request.offset.saturating_add(limit)),
            _ => None,
        };

        let batch_size = match (request.batch_size, self.default_batch_size) {
            (0, 0) => candidates.len().max(1),
            (0, default) => default,
            (requested, _) => requested,
        };

        let mut matched = Vec::new();
        'batches: for batch in candidates.chunks(batch_size) {
            for instance in batch {
                if wanted.is_some_and(|w| matched.len() >= w) {
                    break 'batches;
                }
                let keep = request
                    .predicate
                    .as_ref()
                    .is_none_or(|p| p.evaluate(instance));
                if keep {
                    matched.push(*instance);
                }
            }
        }

        if !request.sort.is_empty() {
            matched.sort_by(|a, b| compare_by(&request.sort, a, b));
        }

        Ok(matched
            .into_iter()
            .skip(request.offset)
            .take(request.limit.unwrap_or(usize::MAX))
            .collect())
    }

    /// Returns the first match, honoring sort and offset.
    pub(crate) fn first(&self, request: &FetchRequest) -> CoreResult<Option<&'a Instance>> {
        let request = request.clone().limit(1);
        Ok(self.execute(&request)?.into_iter().next())
    }

    /// Returns the number of instances `execute` would return.
    pub(crate) fn count(&self, request: &FetchRequest) -> CoreResult<usize> {
        Ok(self.execute(request)?.len())
    }

    /// Folds `key` of every match with `function`.
    pub(crate) fn aggregate(
        &self,
        request: &FetchRequest,
        function: Aggregate,
        key: &str,
    ) -> CoreResult<Value> {
        let descriptor = self.registry.describe(&request.entity)?;
        let attribute = descriptor.attribute_key(key)?;
        let numeric = matches!(attribute.scalar_type, ScalarType::Integer | ScalarType::Float);
        if matches!(function, Aggregate::Sum | Aggregate::Average) && !numeric {
            return Err(CoreError::type_mismatch(
                descriptor.name(),
                key,
                "integer or float",
                attribute.scalar_type.name(),
            ));
        }

        let values: Vec<&Value> = self
            .execute(request)?
            .into_iter()
            .filter_map(|i| i.get(key))
            .filter(|v| !v.is_null())
            .collect();

        Ok(match function {
            Aggregate::Count => Value::Integer(i64::try_from(values.len()).unwrap_or(i64::MAX)),
            Aggregate::Min => values
                .iter()
                .min_by(|a, b| a.sort_cmp(b))
                .map_or(Value::Null, |v| (*v).clone()),
            Aggregate::Max => values
                .iter()
                .max_by(|a, b| a.sort_cmp(b))
                .map_or(Value::Null, |v| (*v).clone()),
            Aggregate::Sum if attribute.scalar_type == ScalarType::Integer => {
                let total: i128 = values.iter().filter_map(|v| v.as_integer()).map(i128::from).sum();
                match i64::try_from(total) {
                    Ok(n) => Value::Integer(n),
                    #[allow(clippy::cast_precision_loss)]
                    Err(_) => Value::Float(total as f64),
                }
            }
            Aggregate::Sum => Value::Float(values.iter().filter_map(|v| v.as_float()).sum()),
            Aggregate::Average => {
                if values.is_empty() {
                    Value::Null
                } else {
                    let total: f64 = values.iter().filter_map(|v| v.as_float()).sum();
                    #[allow(clippy::cast_precision_loss)]
                    let mean = total / values.len() as f64;
                    Value::Float(mean)
                }
            }
        })
    }

    fn validate(&self, request: &FetchRequest) -> CoreResult<()> {
        let descriptor = self.registry.describe(&request.entity)?;
        if let Some(predicate) = &request.predicate {
            predicate.validate(&descriptor)?;
        }
        for sort in &request.sort {
            descriptor.attribute_key(&sort.key)?;
        }
        Ok(())
    }
}

fn compare_by(sort: &[SortDescriptor], a: &Instance, b: &Instance) -> Ordering {
    for rule in sort {
        let left = a.get(&rule.key).unwrap_or(&Value::Null);
        let right = b.get(&rule.key).unwrap_or(&Value::Null);
        let ordering = left.sort_cmp(right);
        let ordering = if rule.ascending {
            ordering
        } else {
            ordering.reverse()
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
