//! Document & value model
//!
//! The value algebra and document representation all other components
//! operate on.
//!
//! # Invariants
//!
//! - Missing and null are distinct: a missing field has no `Value` at all
//! - Document fields keep insertion order
//! - Dotted paths only traverse documents

mod document;
mod ordering;
mod path;
mod value;

pub use document::{Document, DocumentId};
pub use ordering::{compare_comparable, compare_optional, compare_values};
pub use path::FieldPath;
pub use value::{json_type, Value};

/// Name of the identifier field carried by every stored document
pub const ID_FIELD: &str = "_id";
