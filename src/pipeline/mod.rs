//! Aggregation pipeline
//!
//! Ordered stages over a collection snapshot: `$unwind`, `$match`,
//! `$group` (`$first`, `$avg`), `$sort`, `$limit`.
//!
//! # Invariants
//!
//! - Stages execute in the order given
//! - `$group` emits partitions in first-seen order, `_id` first
//! - The source collection is never modified

mod executor;
mod parser;
mod stage;

pub use executor::{run, PipelineExecutor};
pub use stage::{Accumulator, GroupKey, GroupStage, Pipeline, Stage};
