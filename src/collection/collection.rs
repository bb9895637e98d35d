//! Collection
//!
//! An insertion-ordered, `_id`-keyed set of documents behind one
//! reader/writer lock. Readers (`find`, `find_one`, `count_documents`,
//! `aggregate` snapshot) share the lock; every write holds it exclusively
//! for its whole select-and-mutate step.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::config::StoreConfig;
use crate::document::{Document, DocumentId, Value, ID_FIELD};
use crate::errors::{StoreError, StoreResult};
use crate::filter::Filter;
use crate::observability::{Event, Logger, MetricsRegistry, Timer};
use crate::pipeline::{self, Pipeline};
use crate::query::{Cursor, FindOptions, Projection, ResultSorter, ReturnMode};
use crate::update::{self, UpdateSpec};

/// Result of an update operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct UpdateResult {
    /// Documents satisfying the filter
    pub matched_count: u64,
    /// Documents whose content actually changed
    pub modified_count: u64,
}

/// Result of a delete operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

/// Shared settings handed to each collection by its store
#[derive(Debug, Clone)]
pub(crate) struct CollectionContext {
    pub max_document_depth: usize,
    pub logger: Logger,
    pub metrics: Arc<MetricsRegistry>,
}

impl CollectionContext {
    pub fn from_config(config: &StoreConfig, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            max_document_depth: config.max_document_depth,
            logger: config.logger(),
            metrics,
        }
    }
}

impl Default for CollectionContext {
    fn default() -> Self {
        Self::from_config(&StoreConfig::default(), Arc::new(MetricsRegistry::new()))
    }
}

/// Documents keyed by insertion sequence, plus an `_id` index
#[derive(Debug, Default)]
struct CollectionState {
    documents: BTreeMap<u64, Document>,
    ids: HashMap<DocumentId, u64>,
    next_seq: u64,
    created: bool,
}

impl CollectionState {
    /// Sequence of the first document matching the filter
    fn first_match(&self, filter: &Filter) -> Option<u64> {
        self.documents
            .iter()
            .find(|(_, doc)| filter.matches(doc))
            .map(|(seq, _)| *seq)
    }

    fn matching(&self, filter: &Filter) -> Vec<u64> {
        self.documents
            .iter()
            .filter(|(_, doc)| filter.matches(doc))
            .map(|(seq, _)| *seq)
            .collect()
    }

    fn remove(&mut self, seq: u64) -> Option<Document> {
        let document = self.documents.remove(&seq)?;
        if let Some(id) = document.id() {
            self.ids.remove(&id);
        }
        Some(document)
    }
}

/// A named collection of documents
#[derive(Debug)]
pub struct Collection {
    name: String,
    state: RwLock<CollectionState>,
    context: CollectionContext,
}

impl Collection {
    /// Standalone collection with default settings and its own metrics
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_context(name, CollectionContext::default())
    }

    pub(crate) fn with_context(name: impl Into<String>, context: CollectionContext) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(CollectionState::default()),
            context,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once the collection has held a document
    pub fn is_created(&self) -> bool {
        self.read().created
    }

    pub(crate) fn logger(&self) -> &Logger {
        &self.context.logger
    }

    pub(crate) fn metrics(&self) -> &MetricsRegistry {
        &self.context.metrics
    }

    fn read(&self) -> RwLockReadGuard<'_, CollectionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CollectionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Inserts
    // =========================================================================

    /// Insert one document, assigning `_id` when absent
    pub fn insert_one(&self, document: Document) -> StoreResult<DocumentId> {
        let (id, created) = {
            let mut state = self.write();
            self.insert_locked(&mut state, document)?
        };

        self.log_created(created);
        self.context.metrics.add_inserted(1);
        self.context.logger.event(
            Event::DocumentsInserted,
            &[("collection", &self.name), ("count", "1"), ("id", id.as_str())],
        );
        Ok(id)
    }

    /// Insert documents in order, stopping at the first failure. Documents
    /// inserted before the failure stay.
    pub fn insert_many(&self, documents: Vec<Document>) -> StoreResult<Vec<DocumentId>> {
        let mut ids = Vec::with_capacity(documents.len());
        let mut created = false;
        let outcome: StoreResult<()> = {
            let mut state = self.write();
            documents.into_iter().try_for_each(|document| {
                let (id, first) = self.insert_locked(&mut state, document)?;
                created |= first;
                ids.push(id);
                Ok(())
            })
        };

        self.log_created(created);
        if !ids.is_empty() {
            self.context.metrics.add_inserted(ids.len() as u64);
            self.context.logger.event(
                Event::DocumentsInserted,
                &[("collection", &self.name), ("count", &ids.len().to_string())],
            );
        }
        outcome.map(|()| ids)
    }

    fn insert_locked(
        &self,
        state: &mut CollectionState,
        mut document: Document,
    ) -> StoreResult<(DocumentId, bool)> {
        self.check_document(&document)?;

        let id = match document.get(ID_FIELD) {
            None => DocumentId::generate(),
            Some(Value::String(id)) => DocumentId::new(id.as_str()),
            Some(other) => {
                return Err(StoreError::invalid_argument(format!(
                    "_id must be a string, found {}",
                    other.type_name()
                )))
            }
        };
        if state.ids.contains_key(&id) {
            return Err(StoreError::DuplicateKey(id.to_string()));
        }
        document.set_id(&id);

        let seq = state.next_seq;
        state.next_seq += 1;
        state.documents.insert(seq, document);
        state.ids.insert(id.clone(), seq);

        let created = !state.created;
        state.created = true;
        Ok((id, created))
    }

    fn log_created(&self, created: bool) {
        if created {
            self.context
                .logger
                .event(Event::CollectionCreated, &[("collection", &self.name)]);
        }
    }

    fn check_document(&self, document: &Document) -> StoreResult<()> {
        let depth = document.depth();
        if depth > self.context.max_document_depth {
            return Err(StoreError::invalid_argument(format!(
                "document nesting depth {} exceeds limit {}",
                depth, self.context.max_document_depth
            )));
        }
        check_field_names(document)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// First document in insertion order satisfying the filter
    pub fn find_one(&self, filter: &Filter, projection: Option<&Projection>) -> StoreResult<Document> {
        let timer = Timer::start();
        let found = self
            .read()
            .documents
            .values()
            .find(|doc| filter.matches(doc))
            .cloned();
        self.record_query("find_one", found.is_some() as usize, &timer);

        let document = found.ok_or_else(|| {
            StoreError::not_found(format!("no document in '{}' matches the filter", self.name))
        })?;
        Ok(match projection {
            Some(projection) => projection.apply(&document),
            None => document,
        })
    }

    /// Matching documents, sorted then limited. The result set is fixed when
    /// this call returns; the cursor never observes later writes.
    pub fn find(&self, filter: &Filter, options: FindOptions) -> Cursor {
        let timer = Timer::start();
        let mut documents: Vec<Document> = self
            .read()
            .documents
            .values()
            .filter(|doc| filter.matches(doc))
            .cloned()
            .collect();

        if let Some(sort) = &options.sort {
            ResultSorter::sort(&mut documents, sort);
        }
        if let Some(limit) = options.limit {
            documents.truncate(limit);
        }

        self.record_query("find", documents.len(), &timer);
        Cursor::new(documents, options.projection)
    }

    pub fn count_documents(&self, filter: &Filter) -> u64 {
        let timer = Timer::start();
        let count = self
            .read()
            .documents
            .values()
            .filter(|doc| filter.matches(doc))
            .count();
        self.record_query("count_documents", count, &timer);
        count as u64
    }

    /// Copy of every document in insertion order
    pub fn snapshot(&self) -> Vec<Document> {
        self.read().documents.values().cloned().collect()
    }

    /// Run a pipeline over a snapshot taken under the read lock
    pub fn aggregate(&self, pipeline: &Pipeline) -> StoreResult<Vec<Document>> {
        let timer = Timer::start();
        let snapshot = self.snapshot();
        let input = snapshot.len().to_string();

        let output = pipeline::run(snapshot, pipeline)?;

        self.context.metrics.increment_aggregations();
        self.context.logger.event(
            Event::AggregationExecuted,
            &[
                ("collection", &self.name),
                ("duration_us", &timer.elapsed_us()),
                ("input", &input),
                ("output", &output.len().to_string()),
                ("stages", &pipeline.stages().len().to_string()),
            ],
        );
        Ok(output)
    }

    fn record_query(&self, op: &str, returned: usize, timer: &Timer) {
        self.context.metrics.increment_queries_executed();
        self.context.logger.event(
            Event::QueryExecuted,
            &[
                ("collection", &self.name),
                ("duration_us", &timer.elapsed_us()),
                ("op", op),
                ("returned", &returned.to_string()),
            ],
        );
    }

    // =========================================================================
    // Updates
    // =========================================================================

    /// Update the first matching document
    pub fn update_one(&self, filter: &Filter, spec: &UpdateSpec) -> StoreResult<UpdateResult> {
        let result = {
            let mut state = self.write();
            match state.first_match(filter) {
                Some(seq) => Self::update_locked(&mut state, &[seq], spec)?,
                None => UpdateResult::default(),
            }
        };
        self.record_update("update_one", result);
        Ok(result)
    }

    /// Update every matching document. Either every match is updated or,
    /// when any of them fails, none is.
    pub fn update_many(&self, filter: &Filter, spec: &UpdateSpec) -> StoreResult<UpdateResult> {
        let result = {
            let mut state = self.write();
            let matches = state.matching(filter);
            Self::update_locked(&mut state, &matches, spec)?
        };
        self.record_update("update_many", result);
        Ok(result)
    }

    fn update_locked(
        state: &mut CollectionState,
        seqs: &[u64],
        spec: &UpdateSpec,
    ) -> StoreResult<UpdateResult> {
        let mut changed = Vec::new();
        for seq in seqs {
            let Some(current) = state.documents.get(seq) else {
                continue;
            };
            let updated = update::apply(current, spec)?;
            if &updated != current {
                changed.push((*seq, updated));
            }
        }

        let result = UpdateResult {
            matched_count: seqs.len() as u64,
            modified_count: changed.len() as u64,
        };
        for (seq, updated) in changed {
            state.documents.insert(seq, updated);
        }
        Ok(result)
    }

    fn record_update(&self, op: &str, result: UpdateResult) {
        self.context.metrics.add_matched(result.matched_count);
        self.context.metrics.add_modified(result.modified_count);
        self.context.logger.event(
            Event::DocumentsUpdated,
            &[
                ("collection", &self.name),
                ("matched", &result.matched_count.to_string()),
                ("modified", &result.modified_count.to_string()),
                ("op", op),
            ],
        );
    }

    /// Atomically select the first matching document and apply the update.
    ///
    /// Selection and mutation happen under one exclusive lock acquisition;
    /// no other operation observes the document between them.
    pub fn find_one_and_update(
        &self,
        filter: &Filter,
        spec: &UpdateSpec,
        mode: ReturnMode,
    ) -> StoreResult<Document> {
        let (before, after) = {
            let mut state = self.write();
            let seq = state.first_match(filter).ok_or_else(|| {
                StoreError::not_found(format!("no document in '{}' matches the filter", self.name))
            })?;
            let Some(before) = state.documents.get(&seq).cloned() else {
                return Err(StoreError::not_found(format!("document vanished from '{}'", self.name)));
            };
            let after = update::apply(&before, spec)?;
            state.documents.insert(seq, after.clone());
            (before, after)
        };

        let modified = u64::from(before != after);
        self.record_update("find_one_and_update", UpdateResult { matched_count: 1, modified_count: modified });

        Ok(match mode {
            ReturnMode::Before => before,
            ReturnMode::After => after,
        })
    }

    /// Atomically replace every field of the first matching document except
    /// `_id`. The replacement may repeat the existing `_id` but not change it.
    pub fn find_one_and_replace(
        &self,
        filter: &Filter,
        replacement: Document,
        mode: ReturnMode,
    ) -> StoreResult<Document> {
        self.check_document(&replacement)?;

        let (before, after) = {
            let mut state = self.write();
            let seq = state.first_match(filter).ok_or_else(|| {
                StoreError::not_found(format!("no document in '{}' matches the filter", self.name))
            })?;
            let Some(before) = state.documents.get(&seq).cloned() else {
                return Err(StoreError::not_found(format!("document vanished from '{}'", self.name)));
            };
            let id = before
                .id()
                .ok_or_else(|| StoreError::invalid_argument("stored document has no _id"))?;

            match replacement.get(ID_FIELD) {
                None => {}
                Some(Value::String(given)) if given == id.as_str() => {}
                Some(_) => {
                    return Err(StoreError::invalid_argument(format!(
                        "replacement may not change _id '{}'",
                        id
                    )))
                }
            }

            let mut after = replacement;
            after.set_id(&id);
            state.documents.insert(seq, after.clone());
            (before, after)
        };

        self.context.metrics.add_matched(1);
        self.context.metrics.add_modified(u64::from(before != after));
        self.context.logger.event(
            Event::DocumentReplaced,
            &[("collection", &self.name), ("id", before.id().as_ref().map_or("", DocumentId::as_str))],
        );

        Ok(match mode {
            ReturnMode::Before => before,
            ReturnMode::After => after,
        })
    }

    // =========================================================================
    // Deletes
    // =========================================================================

    pub fn delete_one(&self, filter: &Filter) -> DeleteResult {
        let result = {
            let mut state = self.write();
            let removed = state.first_match(filter).and_then(|seq| state.remove(seq));
            DeleteResult {
                deleted_count: u64::from(removed.is_some()),
            }
        };
        self.record_delete("delete_one", result);
        result
    }

    pub fn delete_many(&self, filter: &Filter) -> DeleteResult {
        let result = {
            let mut state = self.write();
            let matches = state.matching(filter);
            let deleted = matches
                .into_iter()
                .filter_map(|seq| state.remove(seq))
                .count();
            DeleteResult {
                deleted_count: deleted as u64,
            }
        };
        self.record_delete("delete_many", result);
        result
    }

    fn record_delete(&self, op: &str, result: DeleteResult) {
        self.context.metrics.add_deleted(result.deleted_count);
        self.context.logger.event(
            Event::DocumentsDeleted,
            &[
                ("collection", &self.name),
                ("deleted", &result.deleted_count.to_string()),
                ("op", op),
            ],
        );
    }
}

/// Stored field names must be addressable by a dotted path: non-empty,
/// no `.` and no leading `$`. Applies to nested documents and to documents
/// inside arrays.
fn check_field_names(document: &Document) -> StoreResult<()> {
    for (name, value) in document.iter() {
        if name.is_empty() {
            return Err(StoreError::invalid_argument("field names may not be empty"));
        }
        if name.starts_with('$') || name.contains('.') {
            return Err(StoreError::invalid_argument(format!(
                "invalid field name '{}'",
                name
            )));
        }
        check_nested_names(value)?;
    }
    Ok(())
}

fn check_nested_names(value: &Value) -> StoreResult<()> {
    match value {
        Value::Document(inner) => check_field_names(inner),
        Value::Array(items) => items.iter().try_for_each(check_nested_names),
        _ => Ok(()),
    }
}
