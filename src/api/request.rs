//! API request types
//!
//! One JSON object per request:
//!
//! ```text
//! {"collection":"users","op":"insertOne","document":{"name":"Ann"}}
//! {"collection":"users","op":"find","filter":{"age":{"$gte":25}},"sort":{"age":-1},"limit":10}
//! {"collection":"users","op":"findOneAndUpdate","filter":{...},"update":{...},"returnDocument":"after"}
//! {"collection":"students","op":"aggregate","pipeline":[...]}
//! {"collection":"users","op":"bulkWrite","operations":[...],"ordered":false}
//! {"op":"listCollections"}
//! ```
//!
//! Filters, updates, pipelines and projections are parsed into their ASTs
//! here, before any collection is touched.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::bulk::WriteModel;
use crate::document::Document;
use crate::errors::StoreError;
use crate::filter::Filter;
use crate::pipeline::Pipeline;
use crate::query::{FindOptions, Projection, ReturnMode, SortSpec};
use crate::update::UpdateSpec;

use super::errors::{ApiError, ApiResult};

/// Parsed request
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    InsertOne { collection: String, document: Document },
    InsertMany { collection: String, documents: Vec<Document> },
    FindOne { collection: String, filter: Filter, projection: Option<Projection> },
    Find { collection: String, filter: Filter, options: FindOptions },
    CountDocuments { collection: String, filter: Filter },
    UpdateOne { collection: String, filter: Filter, update: UpdateSpec },
    UpdateMany { collection: String, filter: Filter, update: UpdateSpec },
    FindOneAndUpdate { collection: String, filter: Filter, update: UpdateSpec, mode: ReturnMode },
    FindOneAndReplace { collection: String, filter: Filter, replacement: Document, mode: ReturnMode },
    DeleteOne { collection: String, filter: Filter },
    DeleteMany { collection: String, filter: Filter },
    Aggregate { collection: String, pipeline: Pipeline },
    BulkWrite { collection: String, operations: Vec<WriteModel>, ordered: bool },
    ListCollections,
    DropCollection { collection: String },
    Metrics,
}

/// Raw request for parsing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRequest {
    op: String,
    #[serde(default)]
    collection: Option<String>,
    #[serde(default)]
    document: Option<JsonValue>,
    #[serde(default)]
    documents: Option<Vec<JsonValue>>,
    #[serde(default)]
    filter: Option<JsonValue>,
    #[serde(default)]
    projection: Option<JsonValue>,
    #[serde(default)]
    sort: Option<JsonValue>,
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default)]
    update: Option<JsonValue>,
    #[serde(default)]
    replacement: Option<JsonValue>,
    #[serde(default)]
    return_document: Option<ReturnMode>,
    #[serde(default)]
    pipeline: Option<JsonValue>,
    #[serde(default)]
    operations: Option<JsonValue>,
    #[serde(default)]
    ordered: Option<bool>,
}

impl RawRequest {
    fn collection(&mut self) -> ApiResult<String> {
        self.collection
            .take()
            .ok_or_else(|| ApiError::invalid_request(format!("{} requires 'collection'", self.op)))
    }

    fn required(op: &str, value: Option<JsonValue>, key: &str) -> ApiResult<JsonValue> {
        value.ok_or_else(|| ApiError::invalid_request(format!("{} requires '{}'", op, key)))
    }

    /// Missing filter means match everything
    fn filter(&self) -> ApiResult<Filter> {
        match &self.filter {
            Some(json) => Ok(Filter::parse(json)?),
            None => Ok(Filter::all()),
        }
    }

    fn projection(&self) -> ApiResult<Option<Projection>> {
        match &self.projection {
            Some(json) => Ok(Some(Projection::parse(json)?)),
            None => Ok(None),
        }
    }

    fn update(&mut self) -> ApiResult<UpdateSpec> {
        let json = Self::required(&self.op, self.update.take(), "update")?;
        Ok(UpdateSpec::parse(&json)?)
    }

    fn find_options(&self) -> ApiResult<FindOptions> {
        let mut options = FindOptions::new();
        if let Some(projection) = self.projection()? {
            options = options.with_projection(projection);
        }
        if let Some(sort) = &self.sort {
            options = options.with_sort(SortSpec::parse(sort)?);
        }
        if let Some(limit) = self.limit {
            let limit = usize::try_from(limit).map_err(|_| {
                ApiError::from(StoreError::invalid_argument(format!(
                    "limit must be non-negative, got {}",
                    limit
                )))
            })?;
            options = options.with_limit(limit);
        }
        Ok(options)
    }
}

impl Request {
    /// Parse a request from a JSON string
    pub fn parse(json: &str) -> ApiResult<Self> {
        let value: JsonValue = serde_json::from_str(json)
            .map_err(|e| ApiError::invalid_request(format!("Invalid JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Parse a request from an already-decoded JSON value
    pub fn from_value(value: JsonValue) -> ApiResult<Self> {
        let mut raw: RawRequest = serde_json::from_value(value)
            .map_err(|e| ApiError::invalid_request(format!("Invalid request: {}", e)))?;

        let request = match raw.op.as_str() {
            "insertOne" => {
                let document = RawRequest::required(&raw.op, raw.document.take(), "document")?;
                Request::InsertOne {
                    collection: raw.collection()?,
                    document: Document::from_json(document)?,
                }
            }
            "insertMany" => {
                let documents = raw
                    .documents
                    .take()
                    .ok_or_else(|| ApiError::invalid_request("insertMany requires 'documents'"))?
                    .into_iter()
                    .map(Document::from_json)
                    .collect::<Result<Vec<_>, _>>()?;
                Request::InsertMany {
                    collection: raw.collection()?,
                    documents,
                }
            }
            "findOne" => Request::FindOne {
                filter: raw.filter()?,
                projection: raw.projection()?,
                collection: raw.collection()?,
            },
            "find" => Request::Find {
                filter: raw.filter()?,
                options: raw.find_options()?,
                collection: raw.collection()?,
            },
            "countDocuments" => Request::CountDocuments {
                filter: raw.filter()?,
                collection: raw.collection()?,
            },
            "updateOne" => Request::UpdateOne {
                filter: raw.filter()?,
                update: raw.update()?,
                collection: raw.collection()?,
            },
            "updateMany" => Request::UpdateMany {
                filter: raw.filter()?,
                update: raw.update()?,
                collection: raw.collection()?,
            },
            "findOneAndUpdate" => Request::FindOneAndUpdate {
                filter: raw.filter()?,
                update: raw.update()?,
                mode: raw.return_document.unwrap_or_default(),
                collection: raw.collection()?,
            },
            "findOneAndReplace" => {
                let replacement =
                    RawRequest::required(&raw.op, raw.replacement.take(), "replacement")?;
                Request::FindOneAndReplace {
                    filter: raw.filter()?,
                    replacement: Document::from_json(replacement)?,
                    mode: raw.return_document.unwrap_or_default(),
                    collection: raw.collection()?,
                }
            }
            "deleteOne" => Request::DeleteOne {
                filter: raw.filter()?,
                collection: raw.collection()?,
            },
            "deleteMany" => Request::DeleteMany {
                filter: raw.filter()?,
                collection: raw.collection()?,
            },
            "aggregate" => {
                let pipeline = RawRequest::required(&raw.op, raw.pipeline.take(), "pipeline")?;
                Request::Aggregate {
                    pipeline: Pipeline::parse(&pipeline)?,
                    collection: raw.collection()?,
                }
            }
            "bulkWrite" => {
                let operations =
                    RawRequest::required(&raw.op, raw.operations.take(), "operations")?;
                Request::BulkWrite {
                    operations: WriteModel::parse_all(&operations)?,
                    ordered: raw.ordered.unwrap_or(true),
                    collection: raw.collection()?,
                }
            }
            "listCollections" => Request::ListCollections,
            "dropCollection" => Request::DropCollection {
                collection: raw.collection()?,
            },
            "metrics" => Request::Metrics,
            other => return Err(ApiError::unknown_operation(other)),
        };
        Ok(request)
    }
}
