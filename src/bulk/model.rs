//! Bulk write models
//!
//! ```text
//! {"insertOne": {"document": {...}}}
//! {"updateOne": {"filter": {...}, "update": {...}}}
//! {"updateMany": {"filter": {...}, "update": {...}}}
//! {"deleteOne": {"filter": {...}}}
//! {"deleteMany": {"filter": {...}}}
//! ```

use serde_json::{Map, Value as JsonValue};

use crate::document::{json_type, Document};
use crate::errors::{StoreError, StoreResult};
use crate::filter::Filter;
use crate::update::UpdateSpec;

/// One write inside a bulk request
#[derive(Debug, Clone, PartialEq)]
pub enum WriteModel {
    InsertOne { document: Document },
    UpdateOne { filter: Filter, update: UpdateSpec },
    UpdateMany { filter: Filter, update: UpdateSpec },
    DeleteOne { filter: Filter },
    DeleteMany { filter: Filter },
}

impl WriteModel {
    pub fn name(&self) -> &'static str {
        match self {
            WriteModel::InsertOne { .. } => "insertOne",
            WriteModel::UpdateOne { .. } => "updateOne",
            WriteModel::UpdateMany { .. } => "updateMany",
            WriteModel::DeleteOne { .. } => "deleteOne",
            WriteModel::DeleteMany { .. } => "deleteMany",
        }
    }

    /// Parse a single-key write model document
    pub fn parse(json: &JsonValue) -> StoreResult<Self> {
        let obj = match json {
            JsonValue::Object(obj) if obj.len() == 1 => obj,
            _ => {
                return Err(StoreError::invalid_argument(
                    "each bulk operation must be a document with exactly one key",
                ))
            }
        };
        let Some((name, body)) = obj.iter().next() else {
            return Err(StoreError::invalid_argument("empty bulk operation"));
        };
        let body = body.as_object().ok_or_else(|| {
            StoreError::invalid_argument(format!(
                "{} expects a document, found {}",
                name,
                json_type(body)
            ))
        })?;

        match name.as_str() {
            "insertOne" => Ok(WriteModel::InsertOne {
                document: Document::from_json(required(name, body, "document")?.clone())?,
            }),
            "updateOne" => Ok(WriteModel::UpdateOne {
                filter: Filter::parse(required(name, body, "filter")?)?,
                update: UpdateSpec::parse(required(name, body, "update")?)?,
            }),
            "updateMany" => Ok(WriteModel::UpdateMany {
                filter: Filter::parse(required(name, body, "filter")?)?,
                update: UpdateSpec::parse(required(name, body, "update")?)?,
            }),
            "deleteOne" => Ok(WriteModel::DeleteOne {
                filter: Filter::parse(required(name, body, "filter")?)?,
            }),
            "deleteMany" => Ok(WriteModel::DeleteMany {
                filter: Filter::parse(required(name, body, "filter")?)?,
            }),
            other => Err(StoreError::invalid_argument(format!(
                "unknown bulk operation '{}'",
                other
            ))),
        }
    }

    /// Parse an array of write models
    pub fn parse_all(json: &JsonValue) -> StoreResult<Vec<Self>> {
        json.as_array()
            .ok_or_else(|| {
                StoreError::invalid_argument(format!(
                    "bulk operations must be an array, found {}",
                    json_type(json)
                ))
            })?
            .iter()
            .map(Self::parse)
            .collect()
    }
}

fn required<'a>(
    op: &str,
    body: &'a Map<String, JsonValue>,
    key: &str,
) -> StoreResult<&'a JsonValue> {
    body.get(key)
        .ok_or_else(|| StoreError::invalid_argument(format!("{} requires '{}'", op, key)))
}
