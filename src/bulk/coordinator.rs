//! Bulk write coordinator
//!
//! A thin driver over `Collection`: each write model is applied through the
//! matching collection method, so each keeps its own atomicity and nothing
//! isolates the batch as a whole from concurrent writers.
//!
//! - Ordered: stop at the first failure; earlier effects stay applied and
//!   the remaining operations are reported `NotAttempted`.
//! - Unordered: attempt everything and collect every failure.

use crate::collection::Collection;
use crate::errors::{StoreError, StoreResult};
use crate::observability::Event;

use super::model::WriteModel;
use super::result::{BulkResult, OperationOutcome};

/// Executes bulk writes against a collection
pub struct BulkCoordinator;

impl BulkCoordinator {
    /// Run the operations in order. Any failure turns the call into
    /// `PartialBulkFailure` carrying the complete result.
    pub fn execute(
        collection: &Collection,
        operations: &[WriteModel],
        ordered: bool,
    ) -> StoreResult<BulkResult> {
        if operations.is_empty() {
            return Err(StoreError::invalid_argument(
                "bulk write requires at least one operation",
            ));
        }

        let mut result = BulkResult::default();
        for (index, operation) in operations.iter().enumerate() {
            match Self::apply(collection, operation, &mut result) {
                Ok(()) => result.outcomes.push(OperationOutcome::Applied),
                Err(error) => {
                    result.record_failure(index, error);
                    if ordered {
                        break;
                    }
                }
            }
        }
        result
            .outcomes
            .resize(operations.len(), OperationOutcome::NotAttempted);

        Self::record(collection, &result, ordered);

        if result.is_success() {
            Ok(result)
        } else {
            Err(StoreError::PartialBulkFailure(Box::new(result)))
        }
    }

    fn apply(
        collection: &Collection,
        operation: &WriteModel,
        result: &mut BulkResult,
    ) -> StoreResult<()> {
        match operation {
            WriteModel::InsertOne { document } => {
                let id = collection.insert_one(document.clone())?;
                result.inserted_count += 1;
                result.inserted_ids.push(id);
            }
            WriteModel::UpdateOne { filter, update } => {
                let updated = collection.update_one(filter, update)?;
                result.matched_count += updated.matched_count;
                result.modified_count += updated.modified_count;
            }
            WriteModel::UpdateMany { filter, update } => {
                let updated = collection.update_many(filter, update)?;
                result.matched_count += updated.matched_count;
                result.modified_count += updated.modified_count;
            }
            WriteModel::DeleteOne { filter } => {
                result.deleted_count += collection.delete_one(filter).deleted_count;
            }
            WriteModel::DeleteMany { filter } => {
                result.deleted_count += collection.delete_many(filter).deleted_count;
            }
        }
        Ok(())
    }

    fn record(collection: &Collection, result: &BulkResult, ordered: bool) {
        let metrics = collection.metrics();
        metrics.increment_bulk_writes();
        metrics.add_bulk_failures(result.errors.len() as u64);

        let event = if result.is_success() {
            Event::BulkWriteComplete
        } else {
            Event::BulkWriteFailed
        };
        collection.logger().event(
            event,
            &[
                ("collection", collection.name()),
                ("deleted", &result.deleted_count.to_string()),
                ("failed", &result.errors.len().to_string()),
                ("inserted", &result.inserted_count.to_string()),
                ("modified", &result.modified_count.to_string()),
                ("not_attempted", &result.not_attempted().to_string()),
                ("ordered", if ordered { "true" } else { "false" }),
            ],
        );
    }
}

impl Collection {
    /// Execute a batch of writes; see `BulkCoordinator::execute`
    pub fn bulk_write(&self, operations: &[WriteModel], ordered: bool) -> StoreResult<BulkResult> {
        BulkCoordinator::execute(self, operations, ordered)
    }
}
