//! The persistence context: working graph, commit and rollback.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::graph::{Instance, Lifecycle, ObjectGraph, PendingChanges, RelationValue};
use crate::journal::{ChangeRecord, CommitBatch, CommitLog};
use crate::predicate::Predicate;
use crate::query::{Aggregate, FetchRequest, QueryExecutor, ResultType, UpdateResult};
use crate::relationship::{check_target, check_value, plan_delete, Integrity};
use crate::schema::{AttributeDescriptor, EntityDescriptor, EntityRegistry, Key};
use crate::snapshot::Snapshot;
use crate::types::{CommitSequence, ObjectId};
use crate::value::Value;
use crate::values::{FieldValue, Values};
use entigraph_storage::{FileJournal, InMemoryJournal, JournalBackend, StorageError};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Values checked against a descriptor, ready to apply.
struct Prepared {
    attributes: Vec<(String, Value)>,
    relations: Vec<(String, RelationValue)>,
}

/// An object-persistence context.
///
/// `Context` owns a working graph of instances and the journal that commits
/// land in. All mutations go to the working graph; [`Context::save`] writes
/// the pending changes as one journal batch and makes them the committed
/// state, [`Context::rollback`] throws them away.
///
/// Every mutating call holds the working graph's write lock for its whole
/// duration, so readers never see one side of a relationship without the
/// other.
///
/// # Example
///
/// ```rust
/// use entigraph_core::{Context, EntityDescriptor, EntityRegistry, FetchRequest, ScalarType, Values};
///
/// let mut registry = EntityRegistry::new();
/// registry.register(
///     EntityDescriptor::builder("Person")
///         .attribute("name", ScalarType::Text)
///         .attribute("age", ScalarType::Integer)
///         .build(),
/// ).unwrap();
///
/// let ctx = Context::in_memory(registry).unwrap();
/// let ahmed = ctx.create("Person", Values::new().set("name", "Ahmed").set("age", 29)).unwrap();
/// assert!(ctx.save().unwrap());
///
/// let young = FetchRequest::new("Person").matching("age < 30", &[]).unwrap();
/// assert_eq!(ctx.find(&young).unwrap()[0].id(), ahmed.id());
/// ```
pub struct Context {
    /// Configuration.
    config: Config,
    /// Entity schema.
    registry: Arc<EntityRegistry>,
    /// Current state, including uncommitted changes.
    working: RwLock<ObjectGraph>,
    /// State as of the last commit.
    committed: RwLock<Arc<ObjectGraph>>,
    /// Sequence of the last commit.
    sequence: AtomicU64,
    /// Durable commit log.
    log: CommitLog,
}

impl Context {
    /// Opens a context over a journal file, replaying every committed batch.
    ///
    /// The journal is locked exclusively until the context is dropped.
    ///
    /// # Errors
    ///
    /// - `InvalidSchema` if the registry fails validation
    /// - `Storage` if the journal is locked by another context, is corrupted,
    ///   or does not exist and `create_if_missing` is false
    /// - `Codec`, `UnknownEntity` or `UnknownKey` if a batch does not match
    ///   the registry
    pub fn open(
        path: impl AsRef<Path>,
        registry: impl Into<Arc<EntityRegistry>>,
        config: Config,
    ) -> CoreResult<Self> {
        let path = path.as_ref();
        if !config.create_if_missing && !path.exists() {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("journal {} does not exist", path.display()),
            ))
            .into());
        }
        let backend = FileJournal::open(path)?;
        info!(path = %path.display(), "opening context");
        Self::with_backend(registry, config, Box::new(backend))
    }

    /// Creates a context whose journal lives in memory.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` if the registry fails validation.
    pub fn in_memory(registry: impl Into<Arc<EntityRegistry>>) -> CoreResult<Self> {
        Self::with_backend(registry, Config::default(), Box::new(InMemoryJournal::new()))
    }

    /// Creates a context over any journal backend, replaying what it holds.
    ///
    /// # Errors
    ///
    /// Same as [`Context::open`].
    pub fn with_backend(
        registry: impl Into<Arc<EntityRegistry>>,
        config: Config,
        backend: Box<dyn JournalBackend>,
    ) -> CoreResult<Self> {
        let registry = registry.into();
        registry.validate()?;

        let log = CommitLog::new(backend, config.sync_on_commit);
        let batches = log.recover()?;

        let mut graph = ObjectGraph::new();
        let mut sequence = CommitSequence::default();
        for batch in &batches {
            replay(&mut graph, &registry, batch)?;
            sequence = batch.sequence;
        }
        info!(
            batches = batches.len(),
            instances = graph.len(),
            %sequence,
            "context ready"
        );

        Ok(Self {
            config,
            registry,
            working: RwLock::new(graph.clone()),
            committed: RwLock::new(Arc::new(graph)),
            sequence: AtomicU64::new(sequence.as_u64()),
            log,
        })
    }

    /// Returns the entity registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.registry
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the sequence of the last commit.
    #[must_use]
    pub fn committed_sequence(&self) -> CommitSequence {
        CommitSequence::new(self.sequence.load(Ordering::Acquire))
    }

    /// Returns the journal size in bytes.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the backend cannot report its size.
    pub fn journal_size(&self) -> CoreResult<u64> {
        self.log.size()
    }

    // ========================================================================
    // Instances
    // ========================================================================

    /// Creates an instance, applying defaults for keys not in `values`.
    ///
    /// # Errors
    ///
    /// - `UnknownEntity` if the entity is not registered
    /// - `UnknownKey` if a key is not part of the entity
    /// - `TypeMismatch` if a value does not fit its key
    /// - `InstanceNotFound` if a related instance is missing or deleted
    pub fn create(&self, entity: &str, values: Values) -> CoreResult<Instance> {
        let descriptor = self.registry.describe(entity)?;
        let mut graph = self.working.write();
        let prepared = self.prepare(&graph, &descriptor, &values)?;
        let id = self.insert(&mut graph, &descriptor, &prepared);
        graph.live(&id).cloned()
    }

    /// Creates one instance per value set, all or nothing.
    ///
    /// Every set is checked before any instance is inserted.
    ///
    /// # Errors
    ///
    /// Same as [`Context::create`]; on error nothing is inserted.
    pub fn bulk_create(&self, entity: &str, sets: Vec<Values>) -> CoreResult<Vec<Instance>> {
        let descriptor = self.registry.describe(entity)?;
        let mut graph = self.working.write();
        let prepared = sets
            .iter()
            .map(|values| self.prepare(&graph, &descriptor, values))
            .collect::<CoreResult<Vec<_>>>()?;

        let ids: Vec<ObjectId> = prepared
            .iter()
            .map(|p| self.insert(&mut graph, &descriptor, p))
            .collect();
        debug!(entity, count = ids.len(), "bulk created instances");
        ids.iter().map(|id| graph.live(id).cloned()).collect()
    }

    /// Assigns attributes and relationships of an existing instance.
    ///
    /// # Errors
    ///
    /// - `InstanceNotFound` if the instance is missing or deleted
    /// - otherwise the same as [`Context::create`]; on error nothing changes
    pub fn set(&self, id: ObjectId, values: Values) -> CoreResult<Instance> {
        let mut graph = self.working.write();
        let descriptor = Arc::clone(graph.live(&id)?.descriptor());
        let prepared = self.prepare(&graph, &descriptor, &values)?;
        self.apply(&mut graph, id, &prepared)?;
        graph.live(&id).cloned()
    }

    /// Reads attribute values.
    ///
    /// Deleted instances stay readable until the next commit.
    ///
    /// # Errors
    ///
    /// - `InstanceNotFound` if the instance does not exist
    /// - `UnknownKey` for names the entity lacks
    /// - `TypeMismatch` for relationship names
    pub fn get(&self, id: ObjectId, keys: &[&str]) -> CoreResult<BTreeMap<String, Value>> {
        let graph = self.working.read();
        let instance = graph
            .get(&id)
            .ok_or_else(|| CoreError::instance_not_found(id))?;
        let descriptor = instance.descriptor();
        let mut values = BTreeMap::new();
        for key in keys {
            descriptor.attribute_key(key)?;
            let value = instance.get(key).cloned().unwrap_or(Value::Null);
            values.insert((*key).to_string(), value);
        }
        Ok(values)
    }

    /// Looks up an instance, including one destroyed but not yet committed.
    #[must_use]
    pub fn find_by_id(&self, id: ObjectId) -> Option<Instance> {
        self.working.read().get(&id).cloned()
    }

    /// Returns every live instance of an entity and its sub-entities.
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntity` if the entity is not registered.
    pub fn find_all(&self, entity: &str) -> CoreResult<Vec<Instance>> {
        self.find(&FetchRequest::new(entity))
    }

    /// Adds `target` to relationship `key` of `id`.
    ///
    /// For a to-one relationship this replaces the current target.
    ///
    /// # Errors
    ///
    /// - `InstanceNotFound` if either instance is missing or deleted
    /// - `UnknownKey` or `TypeMismatch` if `key` is not a relationship
    /// - `TypeMismatch` if `target` is of the wrong entity
    pub fn add_related(&self, id: ObjectId, key: &str, target: ObjectId) -> CoreResult<()> {
        let mut graph = self.working.write();
        let descriptor = Arc::clone(graph.live(&id)?.descriptor());
        let rel = relationship_key(&descriptor, key)?;
        check_target(&graph, &self.registry, descriptor.name(), rel, &target)?;
        Integrity::new(&mut graph, &self.registry).link(id, key, target);
        Ok(())
    }

    /// Removes `target` from relationship `key` of `id`.
    ///
    /// Removing an instance that is not related is a no-op.
    ///
    /// # Errors
    ///
    /// - `InstanceNotFound` if `id` is missing or deleted
    /// - `UnknownKey` or `TypeMismatch` if `key` is not a relationship
    pub fn remove_related(&self, id: ObjectId, key: &str, target: ObjectId) -> CoreResult<()> {
        let mut graph = self.working.write();
        let descriptor = Arc::clone(graph.live(&id)?.descriptor());
        relationship_key(&descriptor, key)?;
        Integrity::new(&mut graph, &self.registry).unlink(id, key, target);
        Ok(())
    }

    /// Returns the live instances related through `key`.
    ///
    /// Members of ordered relationships come back in order.
    ///
    /// # Errors
    ///
    /// - `InstanceNotFound` if `id` does not exist
    /// - `UnknownKey` or `TypeMismatch` if `key` is not a relationship
    pub fn related(&self, id: ObjectId, key: &str) -> CoreResult<Vec<Instance>> {
        let graph = self.working.read();
        let instance = graph
            .get(&id)
            .ok_or_else(|| CoreError::instance_not_found(id))?;
        relationship_key(instance.descriptor(), key)?;
        Ok(instance
            .related_ids(key)
            .iter()
            .filter_map(|member| graph.live(member).ok().cloned())
            .collect())
    }

    /// Destroys an instance, applying delete rules.
    ///
    /// Returns how many instances were destroyed, cascades included.
    ///
    /// # Errors
    ///
    /// - `InstanceNotFound` if the instance is missing or already deleted
    /// - `DeleteDenied` if a deny rule blocks; nothing changes
    pub fn destroy(&self, id: ObjectId) -> CoreResult<usize> {
        let mut graph = self.working.write();
        let plan = plan_delete(&graph, &[id])?;
        Integrity::new(&mut graph, &self.registry).apply_delete(&plan);
        Ok(plan.len())
    }

    /// Destroys every live instance of an entity and its sub-entities.
    ///
    /// # Errors
    ///
    /// - `UnknownEntity` if the entity is not registered
    /// - `DeleteDenied` if a deny rule blocks; nothing changes
    pub fn destroy_all(&self, entity: &str) -> CoreResult<usize> {
        self.registry.describe(entity)?;
        let mut graph = self.working.write();
        let roots: Vec<ObjectId> = graph
            .live_of_kind(&self.registry, entity)
            .iter()
            .map(|i| i.id())
            .collect();
        let plan = plan_delete(&graph, &roots)?;
        Integrity::new(&mut graph, &self.registry).apply_delete(&plan);
        Ok(plan.len())
    }

    /// Discards uncommitted changes to one instance.
    ///
    /// Attributes and relationships return to their committed values, and
    /// the other side of every restored or dropped link follows. A destroyed
    /// instance comes back to life; committed members that have since been
    /// destroyed stay out.
    ///
    /// # Errors
    ///
    /// - `NotPersisted` if the instance was never committed
    /// - `InstanceNotFound` if it is not known at all
    pub fn reload(&self, id: ObjectId) -> CoreResult<Instance> {
        let mut graph = self.working.write();
        let committed = Arc::clone(&self.committed.read());
        let Some(snapshot) = committed.get(&id) else {
            return Err(if graph.get(&id).is_some() {
                CoreError::NotPersisted { id: id.to_string() }
            } else {
                CoreError::instance_not_found(id)
            });
        };

        let touched = {
            let mut integrity = Integrity::new(&mut graph, &self.registry);
            integrity.restore(id, snapshot);
            integrity.touched().clone()
        };

        // Instances now equal to their committed state are clean again.
        for touched_id in touched {
            let Some(baseline) = committed.get(&touched_id) else {
                continue;
            };
            if let Some(instance) = graph.get_mut(&touched_id) {
                if instance.is_updated() && instance.same_content(baseline) {
                    instance.set_lifecycle(Lifecycle::Clean);
                }
            }
        }
        debug!(%id, "reloaded instance");
        graph.live(&id).cloned()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Runs a fetch request against the working graph.
    ///
    /// Uncommitted changes are visible; destroyed instances are not.
    ///
    /// # Errors
    ///
    /// - `UnknownEntity` if the entity is not registered
    /// - `UnknownKey` if the predicate or sort names an unknown key
    pub fn find(&self, request: &FetchRequest) -> CoreResult<Vec<Instance>> {
        let graph = self.working.read();
        Ok(self
            .executor(&graph)
            .execute(request)?
            .into_iter()
            .cloned()
            .collect())
    }

    /// Returns the first match of a fetch request.
    ///
    /// # Errors
    ///
    /// Same as [`Context::find`].
    pub fn find_one(&self, request: &FetchRequest) -> CoreResult<Option<Instance>> {
        let graph = self.working.read();
        Ok(self.executor(&graph).first(request)?.cloned())
    }

    /// Counts the matches of a fetch request.
    ///
    /// # Errors
    ///
    /// Same as [`Context::find`].
    pub fn count(&self, request: &FetchRequest) -> CoreResult<usize> {
        let graph = self.working.read();
        self.executor(&graph).count(request)
    }

    /// Aggregates one attribute over the matches of a fetch request.
    ///
    /// # Errors
    ///
    /// - same as [`Context::find`]
    /// - `TypeMismatch` for `Sum`/`Average` over a non-numeric attribute
    pub fn aggregate(
        &self,
        request: &FetchRequest,
        function: Aggregate,
        key: &str,
    ) -> CoreResult<Value> {
        let graph = self.working.read();
        self.executor(&graph).aggregate(request, function, key)
    }

    /// Applies `values` to every instance of `entity` matching `predicate`.
    ///
    /// # Errors
    ///
    /// Same as [`Context::find`] and [`Context::set`]; values are checked
    /// once, before any instance changes.
    pub fn update(
        &self,
        entity: &str,
        predicate: Predicate,
        values: Values,
        result_type: ResultType,
    ) -> CoreResult<UpdateResult> {
        let descriptor = self.registry.describe(entity)?;
        let mut graph = self.working.write();
        let request = FetchRequest::new(entity).filter(predicate);
        let ids: Vec<ObjectId> = self
            .executor(&graph)
            .execute(&request)?
            .iter()
            .map(|i| i.id())
            .collect();
        let prepared = self.prepare(&graph, &descriptor, &values)?;

        for id in &ids {
            self.apply(&mut graph, *id, &prepared)?;
        }
        debug!(entity, count = ids.len(), "bulk updated instances");

        Ok(match result_type {
            ResultType::UpdatedCount => UpdateResult::Count(ids.len()),
            ResultType::UpdatedObjects => UpdateResult::Instances(
                ids.iter()
                    .filter_map(|id| graph.get(id).cloned())
                    .collect(),
            ),
        })
    }

    /// Updates the instance identified by the entity's unique keys, or
    /// creates one.
    ///
    /// Unique-key attributes present in `values` select the instance. If
    /// none are present, or nothing matches, a new instance is created.
    ///
    /// # Errors
    ///
    /// Same as [`Context::create`].
    pub fn upsert(&self, entity: &str, values: Values) -> CoreResult<Instance> {
        let descriptor = self.registry.describe(entity)?;
        let mut graph = self.working.write();
        let prepared = self.prepare(&graph, &descriptor, &values)?;

        let identity: Vec<(String, Value)> = prepared
            .attributes
            .iter()
            .filter(|(key, _)| descriptor.unique_keys().contains(key))
            .cloned()
            .collect();
        let existing = if identity.is_empty() {
            None
        } else {
            let request = FetchRequest::new(entity).filter(Predicate::from_equalities(identity));
            self.executor(&graph).first(&request)?.map(Instance::id)
        };

        let id = match existing {
            Some(id) => {
                self.apply(&mut graph, id, &prepared)?;
                id
            }
            None => self.insert(&mut graph, &descriptor, &prepared),
        };
        graph.live(&id).cloned()
    }

    /// Returns the committed state as an immutable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let committed = self.committed.read();
        Snapshot::new(
            Arc::clone(&committed),
            Arc::clone(&self.registry),
            self.committed_sequence(),
            self.config.default_batch_size,
        )
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Returns true if a commit would write anything.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.working.read().pending().is_empty()
    }

    /// Counts pending changes by kind.
    #[must_use]
    pub fn pending_changes(&self) -> PendingChanges {
        self.working.read().pending()
    }

    /// Commits every pending change as one journal batch.
    ///
    /// Returns false without touching the journal when nothing is pending.
    ///
    /// # Errors
    ///
    /// Returns `CommitFailed` if the commit lock is not acquired within the
    /// configured timeout, the journal append fails, or the append overruns
    /// the timeout. Neither the journal nor the working graph changes.
    pub fn save(&self) -> CoreResult<bool> {
        let deadline = Instant::now() + self.config.commit_timeout;
        let mut graph = self
            .working
            .try_write_until(deadline)
            .ok_or_else(|| CoreError::commit_failed("timed out waiting for the commit lock"))?;

        let pending = graph.pending();
        if pending.is_empty() {
            graph.purge_deleted();
            return Ok(false);
        }

        let sequence = self.committed_sequence().next();
        let mut batch = CommitBatch::new(sequence);
        for instance in graph.changed() {
            batch.changes.push(if instance.is_deleted() {
                ChangeRecord::delete(instance)
            } else {
                ChangeRecord::upsert(instance)
            });
        }
        self.log.append(&batch, deadline)?;

        let settled = graph.settled();
        {
            // Snapshots read both under the committed lock.
            let mut committed = self.committed.write();
            *committed = Arc::new(settled.clone());
            self.sequence.store(sequence.as_u64(), Ordering::Release);
        }
        *graph = settled;

        debug!(
            %sequence,
            inserted = pending.inserted,
            updated = pending.updated,
            deleted = pending.deleted,
            "committed changes"
        );
        Ok(true)
    }

    /// Discards every pending change.
    pub fn rollback(&self) {
        let mut graph = self.working.write();
        let pending = graph.pending();
        *graph = ObjectGraph::clone(&self.committed.read());
        debug!(discarded = pending.total(), "rolled back");
    }

    /// Runs `f`, saving on success and rolling back on error.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or from the save; either way the working
    /// graph is back at the committed state.
    pub fn transaction<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&Self) -> CoreResult<T>,
    {
        let result = f(self).and_then(|value| {
            self.save()?;
            Ok(value)
        });
        if result.is_err() {
            self.rollback();
        }
        result
    }

    /// Compacts the journal into a single batch holding the committed state.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the journal cannot be rewritten; the old journal
    /// stays in place.
    pub fn checkpoint(&self) -> CoreResult<()> {
        // Holding the working lock keeps saves out while the log is rewritten.
        let _graph = self.working.write();
        let committed = Arc::clone(&self.committed.read());
        let sequence = self.committed_sequence();

        let batches = if sequence.as_u64() == 0 {
            Vec::new()
        } else {
            let mut batch = CommitBatch::new(sequence);
            batch.changes = committed
                .ordered()
                .into_iter()
                .map(ChangeRecord::upsert)
                .collect();
            vec![batch]
        };

        let before = self.log.size()?;
        self.log.rewrite(&batches)?;
        info!(
            %sequence,
            instances = committed.len(),
            before,
            after = self.log.size()?,
            "checkpointed journal"
        );
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn executor<'a>(&'a self, graph: &'a ObjectGraph) -> QueryExecutor<'a> {
        QueryExecutor::new(graph, &self.registry, self.config.default_batch_size)
    }

    /// Checks `values` against `descriptor` without touching the graph.
    fn prepare(
        &self,
        graph: &ObjectGraph,
        descriptor: &EntityDescriptor,
        values: &Values,
    ) -> CoreResult<Prepared> {
        let entity = descriptor.name();
        let mut prepared = Prepared {
            attributes: Vec::new(),
            relations: Vec::new(),
        };
        for (key, field) in values.iter() {
            match (descriptor.key(key)?, field) {
                (Key::Attribute(attribute), FieldValue::Scalar(value)) => {
                    let value = coerce(entity, attribute, value.clone())?;
                    prepared.attributes.push((key.to_string(), value));
                }
                (Key::Relationship(rel), FieldValue::Relation(value)) => {
                    check_value(graph, &self.registry, entity, rel, value)?;
                    prepared.relations.push((key.to_string(), dedup(value)));
                }
                (Key::Attribute(attribute), FieldValue::Relation(_)) => {
                    return Err(CoreError::type_mismatch(
                        entity,
                        key,
                        attribute.scalar_type.name(),
                        "relationship",
                    ));
                }
                (Key::Relationship(_), FieldValue::Scalar(value)) => {
                    return Err(CoreError::type_mismatch(
                        entity,
                        key,
                        "relationship",
                        value.type_name(),
                    ));
                }
            }
        }
        Ok(prepared)
    }

    fn insert(
        &self,
        graph: &mut ObjectGraph,
        descriptor: &Arc<EntityDescriptor>,
        prepared: &Prepared,
    ) -> ObjectId {
        let mut instance = Instance::transient(ObjectId::new(), Arc::clone(descriptor));
        for (key, value) in &prepared.attributes {
            instance.put(key, value.clone());
        }
        let id = graph.insert(instance);
        let mut integrity = Integrity::new(graph, &self.registry);
        for (key, value) in &prepared.relations {
            integrity.assign(id, key, value);
        }
        id
    }

    fn apply(&self, graph: &mut ObjectGraph, id: ObjectId, prepared: &Prepared) -> CoreResult<()> {
        let instance = graph.live_mut(&id)?;
        for (key, value) in &prepared.attributes {
            instance.put(key, value.clone());
        }
        let mut integrity = Integrity::new(graph, &self.registry);
        for (key, value) in &prepared.relations {
            integrity.assign(id, key, value);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("entities", &self.registry.len())
            .field("sequence", &self.committed_sequence())
            .field("pending", &self.pending_changes())
            .finish_non_exhaustive()
    }
}

fn relationship_key<'a>(
    descriptor: &'a EntityDescriptor,
    key: &str,
) -> CoreResult<&'a crate::schema::RelationshipDescriptor> {
    match descriptor.key(key)? {
        Key::Relationship(rel) => Ok(rel),
        Key::Attribute(attribute) => Err(CoreError::type_mismatch(
            descriptor.name(),
            key,
            "relationship",
            attribute.scalar_type.name(),
        )),
    }
}

fn coerce(entity: &str, attribute: &AttributeDescriptor, value: Value) -> CoreResult<Value> {
    if value.is_null() {
        return if attribute.optional {
            Ok(Value::Null)
        } else {
            Err(CoreError::type_mismatch(
                entity,
                &attribute.name,
                attribute.scalar_type.name(),
                "null",
            ))
        };
    }
    let actual = value.type_name();
    attribute.scalar_type.coerce(value).ok_or_else(|| {
        CoreError::type_mismatch(entity, &attribute.name, attribute.scalar_type.name(), actual)
    })
}

fn dedup(value: &RelationValue) -> RelationValue {
    match value {
        RelationValue::Many(ids) => {
            let mut unique = Vec::with_capacity(ids.len());
            for id in ids {
                if !unique.contains(id) {
                    unique.push(*id);
                }
            }
            RelationValue::Many(unique)
        }
        one => one.clone(),
    }
}

/// Applies one committed batch to a graph being rebuilt from the journal.
fn replay(graph: &mut ObjectGraph, registry: &EntityRegistry, batch: &CommitBatch) -> CoreResult<()> {
    for change in &batch.changes {
        match change {
            ChangeRecord::Upsert {
                id,
                entity,
                attributes,
                relationships,
            } => {
                let descriptor = registry.describe(entity)?;
                let mut instance = Instance::transient(*id, Arc::clone(&descriptor));
                for (key, value) in attributes {
                    descriptor.attribute_key(key)?;
                    instance.put(key, value.clone());
                }
                for (key, value) in relationships {
                    let slot = instance
                        .relation_mut(key)
                        .ok_or_else(|| CoreError::unknown_key(entity, key))?;
                    *slot = value.clone();
                }
                instance.set_lifecycle(Lifecycle::Clean);
                instance.set_persisted(true);
                graph.place(instance);
            }
            ChangeRecord::Delete { id, .. } => {
                graph.remove(id);
            }
        }
    }
    debug!(sequence = %batch.sequence, changes = batch.changes.len(), "replayed batch");
    Ok(())
}
