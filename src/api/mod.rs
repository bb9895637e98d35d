//! Request API
//!
//! JSON request envelope in, JSON response out, dispatched against a
//! `Store`. Engine error codes are passed through unchanged.
//!
//! # Supported Operations
//!
//! insertOne, insertMany, findOne, find, countDocuments, updateOne,
//! updateMany, findOneAndUpdate, findOneAndReplace, deleteOne, deleteMany,
//! aggregate, bulkWrite, listCollections, dropCollection, metrics

mod errors;
mod handler;
mod request;
mod response;

pub use errors::{ApiError, ApiErrorCode, ApiResult};
pub use handler::ApiHandler;
pub use request::Request;
pub use response::{ErrorResponse, Response, SuccessResponse};
