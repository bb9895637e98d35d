//! Update executor
//!
//! Applies field-level mutation operators (`$set`, `$unset`, `$addToSet`,
//! `$pull`) to a document, producing a new document.
//!
//! # Invariants
//!
//! - `$addToSet` never introduces duplicates under value equality
//! - `$pull` removes zero or more elements and never fails when none match
//! - `_id` cannot be targeted
//! - Directives in one specification touch independent fields

mod ast;
mod executor;
mod parser;

pub use ast::{Directive, PullCondition, UpdateSpec};
pub use executor::{apply, UpdateExecutor};
