//! Bulk operation coordinator
//!
//! Sequences heterogeneous writes against one collection with ordered or
//! unordered failure semantics. Partial application is the contract: there
//! is no rollback.

mod coordinator;
mod model;
mod result;

pub use coordinator::BulkCoordinator;
pub use model::WriteModel;
pub use result::{BulkResult, BulkWriteError, OperationOutcome};
