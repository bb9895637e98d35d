//! Bulk Write Tests
//!
//! Ordered and unordered batches of write models:
//! - Counts aggregate across operations
//! - Ordered mode stops at the first failure, keeping earlier effects
//! - Unordered mode attempts every operation
//! - Failures surface as a partial bulk failure carrying every outcome

use docstore::bulk::{BulkResult, OperationOutcome, WriteModel};
use docstore::collection::{Collection, Store};
use docstore::errors::{StoreError, StoreErrorCode};
use docstore::filter::Filter;
use docstore::query::FindOptions;
use docstore::Document;
use serde_json::{json, Value as JsonValue};

fn models(json: JsonValue) -> Vec<WriteModel> {
    WriteModel::parse_all(&json).unwrap()
}

fn ids(collection: &Collection) -> Vec<String> {
    collection
        .find(&Filter::all(), FindOptions::new())
        .map(|d| d.id().unwrap().to_string())
        .collect()
}

fn partial(err: StoreError) -> BulkResult {
    assert_eq!(err.code(), StoreErrorCode::PartialBulkFailure);
    err.bulk_result().cloned().unwrap()
}

/// Insert 1, duplicate 1, insert 2
fn batch_with_duplicate() -> Vec<WriteModel> {
    models(json!([
        {"insertOne": {"document": {"_id": "1", "v": 1}}},
        {"insertOne": {"document": {"_id": "1", "v": 2}}},
        {"insertOne": {"document": {"_id": "2", "v": 3}}}
    ]))
}

// =============================================================================
// Successful Batches
// =============================================================================

/// Test: Mixed operations aggregate their counts
#[test]
fn test_mixed_batch_counts() {
    let c = Collection::new("items");
    let result = c
        .bulk_write(
            &models(json!([
                {"insertOne": {"document": {"_id": "a", "n": 1}}},
                {"insertOne": {"document": {"_id": "b", "n": 2}}},
                {"insertOne": {"document": {"_id": "c", "n": 2}}},
                {"updateMany": {"filter": {"n": 2}, "update": {"$set": {"n": 3}}}},
                {"updateOne": {"filter": {"_id": "a"}, "update": {"$set": {"n": 1}}}},
                {"deleteOne": {"filter": {"_id": "b"}}}
            ])),
            true,
        )
        .unwrap();

    assert!(result.is_success());
    assert_eq!(result.inserted_count, 3);
    assert_eq!(result.matched_count, 3);
    assert_eq!(result.modified_count, 2);
    assert_eq!(result.deleted_count, 1);
    assert_eq!(result.inserted_ids.len(), 3);
    assert!(result.outcomes.iter().all(|o| *o == OperationOutcome::Applied));
    assert_eq!(ids(&c), vec!["a", "c"]);
}

/// Test: Operations observe the effects of earlier operations in the batch
#[test]
fn test_operations_apply_in_order() {
    let c = Collection::new("items");
    let result = c
        .bulk_write(
            &models(json!([
                {"insertOne": {"document": {"_id": "x"}}},
                {"deleteMany": {"filter": {"_id": "x"}}},
                {"insertOne": {"document": {"_id": "x", "again": true}}}
            ])),
            true,
        )
        .unwrap();
    assert_eq!(result.deleted_count, 1);
    assert_eq!(c.len(), 1);
}

/// Test: An empty batch is rejected
#[test]
fn test_empty_batch_rejected() {
    let c = Collection::new("items");
    let err = c.bulk_write(&[], true).unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::InvalidArgument);
}

// =============================================================================
// Failures
// =============================================================================

/// Test: Ordered mode stops at the first failure
#[test]
fn test_ordered_stops_at_failure() {
    let c = Collection::new("items");
    let result = partial(c.bulk_write(&batch_with_duplicate(), true).unwrap_err());

    assert_eq!(result.inserted_count, 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].index, 1);
    assert_eq!(result.errors[0].error.code(), StoreErrorCode::DuplicateKey);
    assert_eq!(result.outcomes[0], OperationOutcome::Applied);
    assert!(matches!(result.outcomes[1], OperationOutcome::Failed(_)));
    assert_eq!(result.outcomes[2], OperationOutcome::NotAttempted);
    assert_eq!(result.not_attempted(), 1);
    assert_eq!(ids(&c), vec!["1"]);
}

/// Test: Unordered mode attempts every operation
#[test]
fn test_unordered_attempts_everything() {
    let c = Collection::new("items");
    let result = partial(c.bulk_write(&batch_with_duplicate(), false).unwrap_err());

    assert_eq!(result.inserted_count, 2);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.not_attempted(), 0);
    assert_eq!(result.outcomes[2], OperationOutcome::Applied);
    assert_eq!(ids(&c), vec!["1", "2"]);
}

/// Test: Update failures are reported with their index
#[test]
fn test_update_failure_index() {
    let c = Collection::new("items");
    let result = partial(
        c.bulk_write(
            &models(json!([
                {"insertOne": {"document": {"_id": "a", "tags": "scalar"}}},
                {"deleteOne": {"filter": {"_id": "none"}}},
                {"updateOne": {"filter": {"_id": "a"}, "update": {"$addToSet": {"tags": "x"}}}},
                {"insertOne": {"document": {"_id": "b"}}}
            ])),
            false,
        )
        .unwrap_err(),
    );

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].index, 2);
    assert_eq!(result.errors[0].error.code(), StoreErrorCode::TypeMismatch);
    assert_eq!(result.deleted_count, 0);
    assert_eq!(result.inserted_count, 2);
}

/// Test: Malformed write models are rejected at parse time
#[test]
fn test_invalid_models_rejected() {
    assert!(WriteModel::parse(&json!({"replaceOne": {"filter": {}}})).is_err());
    assert!(WriteModel::parse(&json!({"insertOne": {}})).is_err());
    assert!(WriteModel::parse(&json!({"updateOne": {"filter": {}, "update": {"x": 1}}})).is_err());
    assert!(WriteModel::parse_all(&json!({"insertOne": {"document": {}}})).is_err());
}

// =============================================================================
// Metrics
// =============================================================================

/// Test: Bulk writes are counted in store metrics
#[test]
fn test_bulk_metrics() {
    let store = Store::new();
    let c = store.get_collection("items").unwrap();
    c.bulk_write(&batch_with_duplicate(), false).unwrap_err();
    c.bulk_write(
        &[WriteModel::InsertOne {
            document: Document::from_json(json!({"_id": "3"})).unwrap(),
        }],
        true,
    )
    .unwrap();

    let metrics = store.metrics();
    assert_eq!(metrics.bulk_writes, 2);
    assert_eq!(metrics.bulk_operation_failures, 1);
    assert_eq!(metrics.documents_inserted, 3);
}
