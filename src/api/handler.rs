//! API handler
//!
//! Dispatches parsed requests to a `Store`. Holds no lock of its own:
//! concurrency control lives in each collection.

use serde::Serialize;
use serde_json::{json, Value};

use crate::bulk::{BulkResult, OperationOutcome};
use crate::collection::Store;
use crate::document::Document;
use crate::errors::StoreError;

use super::errors::{ApiError, ApiResult};
use super::request::Request;
use super::response::Response;

/// Request dispatcher bound to one store
pub struct ApiHandler<'a> {
    store: &'a Store,
}

impl<'a> ApiHandler<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Handle a raw JSON request string
    pub fn handle(&self, json_request: &str) -> Response {
        let result = Request::parse(json_request).and_then(|request| self.execute(request));
        Self::respond(result)
    }

    /// Handle an already-decoded JSON request
    pub fn handle_value(&self, request: Value) -> Response {
        let result = Request::from_value(request).and_then(|request| self.execute(request));
        Self::respond(result)
    }

    fn respond(result: ApiResult<Value>) -> Response {
        match result {
            Ok(data) => Response::success(data),
            Err(e) => Response::error(&e),
        }
    }

    /// Execute a parsed request, returning the `data` payload
    pub fn execute(&self, request: Request) -> ApiResult<Value> {
        match request {
            Request::InsertOne { collection, document } => {
                let id = self.store.get_collection(&collection)?.insert_one(document)?;
                Ok(json!({"inserted_id": id.as_str()}))
            }
            Request::InsertMany { collection, documents } => {
                let ids = self.store.get_collection(&collection)?.insert_many(documents)?;
                Ok(json!({"inserted_ids": ids}))
            }
            Request::FindOne { collection, filter, projection } => {
                let document = self
                    .store
                    .get_collection(&collection)?
                    .find_one(&filter, projection.as_ref())?;
                Ok(document.to_json())
            }
            Request::Find { collection, filter, options } => {
                let cursor = self.store.get_collection(&collection)?.find(&filter, options);
                Ok(documents_json(cursor))
            }
            Request::CountDocuments { collection, filter } => {
                let count = self.store.get_collection(&collection)?.count_documents(&filter);
                Ok(json!(count))
            }
            Request::UpdateOne { collection, filter, update } => {
                to_data(&self.store.get_collection(&collection)?.update_one(&filter, &update)?)
            }
            Request::UpdateMany { collection, filter, update } => {
                to_data(&self.store.get_collection(&collection)?.update_many(&filter, &update)?)
            }
            Request::FindOneAndUpdate { collection, filter, update, mode } => {
                let document = self
                    .store
                    .get_collection(&collection)?
                    .find_one_and_update(&filter, &update, mode)?;
                Ok(document.to_json())
            }
            Request::FindOneAndReplace { collection, filter, replacement, mode } => {
                let document = self
                    .store
                    .get_collection(&collection)?
                    .find_one_and_replace(&filter, replacement, mode)?;
                Ok(document.to_json())
            }
            Request::DeleteOne { collection, filter } => {
                to_data(&self.store.get_collection(&collection)?.delete_one(&filter))
            }
            Request::DeleteMany { collection, filter } => {
                to_data(&self.store.get_collection(&collection)?.delete_many(&filter))
            }
            Request::Aggregate { collection, pipeline } => {
                let rows = self.store.get_collection(&collection)?.aggregate(&pipeline)?;
                Ok(documents_json(rows))
            }
            Request::BulkWrite { collection, operations, ordered } => {
                let collection = self.store.get_collection(&collection)?;
                match collection.bulk_write(&operations, ordered) {
                    Ok(result) => bulk_json(&result),
                    Err(StoreError::PartialBulkFailure(result)) => {
                        let details = bulk_json(&result)?;
                        Err(ApiError::from(StoreError::PartialBulkFailure(result))
                            .with_details(details))
                    }
                    Err(other) => Err(other.into()),
                }
            }
            Request::ListCollections => Ok(json!(self.store.collection_names())),
            Request::DropCollection { collection } => {
                Ok(json!({"dropped": self.store.drop_collection(&collection)}))
            }
            Request::Metrics => to_data(&self.store.metrics()),
        }
    }
}

fn to_data<T: Serialize>(value: &T) -> ApiResult<Value> {
    Ok(serde_json::to_value(value)?)
}

fn documents_json(documents: impl IntoIterator<Item = Document>) -> Value {
    Value::Array(documents.into_iter().map(|d| d.to_json()).collect())
}

/// Counts plus one outcome per operation, failures carrying their error
fn bulk_json(result: &BulkResult) -> ApiResult<Value> {
    let mut data = to_data(result)?;
    let outcomes: Vec<Value> = result
        .outcomes
        .iter()
        .map(|outcome| match outcome {
            OperationOutcome::Failed(error) => json!({
                "outcome": outcome.as_str(),
                "code": error.code().code(),
                "message": error.to_string(),
            }),
            _ => json!({"outcome": outcome.as_str()}),
        })
        .collect();
    if let Some(obj) = data.as_object_mut() {
        obj.insert("outcomes".to_string(), Value::Array(outcomes));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_data(handler: &ApiHandler<'_>, request: Value) -> Value {
        match handler.handle_value(request) {
            Response::Success(r) => r.data,
            Response::Error(e) => panic!("unexpected error: {:?}", e),
        }
    }

    #[test]
    fn test_insert_then_find() {
        let store = Store::new();
        let handler = ApiHandler::new(&store);

        let data = ok_data(
            &handler,
            json!({"op": "insertOne", "collection": "users", "document": {"_id": "u1", "name": "Ann"}}),
        );
        assert_eq!(data, json!({"inserted_id": "u1"}));

        let data = ok_data(
            &handler,
            json!({"op": "find", "collection": "users", "projection": {"name": 1}}),
        );
        assert_eq!(data, json!([{"name": "Ann"}]));
    }

    #[test]
    fn test_not_found_is_error_response() {
        let store = Store::new();
        let handler = ApiHandler::new(&store);
        let resp = handler.handle(r#"{"op":"findOne","collection":"users","filter":{"x":1}}"#);
        match resp {
            Response::Error(e) => assert_eq!(e.code, "DOCSTORE_NOT_FOUND"),
            _ => panic!("expected error"),
        }
    }

    #[test]
    fn test_update_result_shape() {
        let store = Store::new();
        let handler = ApiHandler::new(&store);
        ok_data(
            &handler,
            json!({"op": "insertMany", "collection": "u", "documents": [{"a": 1}, {"a": 2}]}),
        );
        let data = ok_data(
            &handler,
            json!({"op": "updateMany", "collection": "u", "filter": {}, "update": {"$set": {"a": 2}}}),
        );
        assert_eq!(data, json!({"matched_count": 2, "modified_count": 1}));
    }

    #[test]
    fn test_bulk_failure_carries_outcomes() {
        let store = Store::new();
        let handler = ApiHandler::new(&store);
        let resp = handler.handle_value(json!({
            "op": "bulkWrite",
            "collection": "u",
            "operations": [
                {"insertOne": {"document": {"_id": "a"}}},
                {"insertOne": {"document": {"_id": "a"}}},
                {"deleteMany": {"filter": {}}}
            ]
        }));

        let Response::Error(e) = resp else {
            panic!("expected error");
        };
        assert_eq!(e.code, "DOCSTORE_PARTIAL_BULK_FAILURE");
        let details = e.details.unwrap();
        assert_eq!(details["inserted_count"], 1);
        assert_eq!(details["outcomes"][0]["outcome"], "applied");
        assert_eq!(details["outcomes"][1]["code"], "DOCSTORE_DUPLICATE_KEY");
        assert_eq!(details["outcomes"][2]["outcome"], "not_attempted");
    }

    #[test]
    fn test_list_and_metrics() {
        let store = Store::new();
        let handler = ApiHandler::new(&store);
        ok_data(&handler, json!({"op": "insertOne", "collection": "b", "document": {}}));
        ok_data(&handler, json!({"op": "insertOne", "collection": "a", "document": {}}));

        assert_eq!(ok_data(&handler, json!({"op": "listCollections"})), json!(["a", "b"]));
        assert_eq!(
            ok_data(&handler, json!({"op": "metrics"}))["documents_inserted"],
            2
        );
    }
}
