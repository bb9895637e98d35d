//! Bulk write results

use serde::Serialize;

use crate::document::DocumentId;
use crate::errors::StoreError;

/// What happened to one operation of a bulk write
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    Applied,
    Failed(StoreError),
    /// Skipped because an earlier operation failed in ordered mode
    NotAttempted,
}

impl OperationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationOutcome::Applied => "applied",
            OperationOutcome::Failed(_) => "failed",
            OperationOutcome::NotAttempted => "not_attempted",
        }
    }
}

/// A failed operation and its position in the request
#[derive(Debug, Clone, PartialEq)]
pub struct BulkWriteError {
    pub index: usize,
    pub error: StoreError,
}

/// Aggregate counts plus one outcome per submitted operation
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BulkResult {
    pub inserted_count: u64,
    pub matched_count: u64,
    pub modified_count: u64,
    pub deleted_count: u64,
    pub inserted_ids: Vec<DocumentId>,
    #[serde(skip)]
    pub errors: Vec<BulkWriteError>,
    #[serde(skip)]
    pub outcomes: Vec<OperationOutcome>,
}

impl BulkResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn record_failure(&mut self, index: usize, error: StoreError) {
        self.outcomes.push(OperationOutcome::Failed(error.clone()));
        self.errors.push(BulkWriteError { index, error });
    }

    /// Number of operations that were not attempted
    pub fn not_attempted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, OperationOutcome::NotAttempted))
            .count()
    }
}
