//! Predicate evaluator
//!
//! Matches documents against structured filters.
//!
//! # Semantics
//!
//! - `$and` / `$or` short-circuit; `{$and: []}` always holds, `{$or: []}` never
//! - A leaf whose path does not resolve holds only for `$exists: false`
//! - A leaf resolving to an array holds if any element satisfies it
//! - `$regex` patterns are compiled once when the filter is built

mod ast;
mod evaluator;
mod parser;

pub use ast::{Condition, Filter, Pattern, Predicate};
pub use evaluator::{matches, PredicateFilter};
