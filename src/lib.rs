//! docstore - an in-memory document collection engine
//!
//! Filters, field updates, atomic find-and-modify, bulk writes and
//! aggregation pipelines over named collections of JSON-like documents.

pub mod api;
pub mod bulk;
pub mod cli;
pub mod collection;
pub mod config;
pub mod document;
pub mod errors;
pub mod filter;
pub mod observability;
pub mod pipeline;
pub mod query;
pub mod update;

pub use collection::{Collection, Store};
pub use document::{Document, DocumentId, Value};
pub use errors::{StoreError, StoreResult};
