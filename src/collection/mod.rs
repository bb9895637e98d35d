//! Collections and the store that names them
//!
//! # Concurrency
//!
//! Each collection has one reader/writer lock. Reads run concurrently with
//! each other, never with a write. `find_one_and_update` and
//! `find_one_and_replace` hold the write lock across selection and mutation.
//! Aggregations run over a snapshot taken under the read lock.

mod collection;
mod store;

pub use collection::{Collection, DeleteResult, UpdateResult};
pub use store::Store;
