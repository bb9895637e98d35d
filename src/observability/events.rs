//! Engine events
//!
//! Every observable engine action is one of these; names are stable.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// First use of a collection name
    CollectionCreated,
    /// Collection removed from the store
    CollectionDropped,
    /// One or more documents inserted
    DocumentsInserted,
    /// Update applied to zero or more documents
    DocumentsUpdated,
    /// Delete applied to zero or more documents
    DocumentsDeleted,
    /// Whole-document replacement
    DocumentReplaced,
    /// Read (find, find_one, count) completed
    QueryExecuted,
    /// Pipeline completed
    AggregationExecuted,
    /// Bulk write finished without failures
    BulkWriteComplete,
    /// Bulk write finished with at least one failed operation
    BulkWriteFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::CollectionCreated => "COLLECTION_CREATED",
            Event::CollectionDropped => "COLLECTION_DROPPED",
            Event::DocumentsInserted => "DOCUMENTS_INSERTED",
            Event::DocumentsUpdated => "DOCUMENTS_UPDATED",
            Event::DocumentsDeleted => "DOCUMENTS_DELETED",
            Event::DocumentReplaced => "DOCUMENT_REPLACED",
            Event::QueryExecuted => "QUERY_COMPLETE",
            Event::AggregationExecuted => "AGGREGATION_COMPLETE",
            Event::BulkWriteComplete => "BULK_WRITE_COMPLETE",
            Event::BulkWriteFailed => "BULK_WRITE_FAILED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::QueryExecuted | Event::AggregationExecuted => Severity::Trace,
            Event::BulkWriteFailed => Severity::Warn,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::CollectionCreated,
            Event::CollectionDropped,
            Event::DocumentsInserted,
            Event::DocumentsUpdated,
            Event::DocumentsDeleted,
            Event::DocumentReplaced,
            Event::QueryExecuted,
            Event::AggregationExecuted,
            Event::BulkWriteComplete,
            Event::BulkWriteFailed,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_event_severity() {
        assert_eq!(Event::QueryExecuted.severity(), Severity::Trace);
        assert_eq!(Event::DocumentsInserted.severity(), Severity::Info);
        assert_eq!(Event::BulkWriteFailed.severity(), Severity::Warn);
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::DocumentReplaced), "DOCUMENT_REPLACED");
    }
}
