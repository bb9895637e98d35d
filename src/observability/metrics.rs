//! Metrics registry
//!
//! - Counters only, monotonic
//! - Reset only when the store is created
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one store
///
/// All counters use Relaxed atomics; a snapshot is not a consistent cut
/// across counters.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    documents_inserted: AtomicU64,
    documents_matched: AtomicU64,
    documents_modified: AtomicU64,
    documents_deleted: AtomicU64,
    queries_executed: AtomicU64,
    aggregations_executed: AtomicU64,
    bulk_writes: AtomicU64,
    bulk_operation_failures: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_inserted(&self, n: u64) {
        self.documents_inserted.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_matched(&self, n: u64) {
        self.documents_matched.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_modified(&self, n: u64) {
        self.documents_modified.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_deleted(&self, n: u64) {
        self.documents_deleted.fetch_add(n, Ordering::Relaxed);
    }

    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_aggregations(&self) {
        self.aggregations_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_bulk_writes(&self) {
        self.bulk_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_bulk_failures(&self, n: u64) {
        self.bulk_operation_failures.fetch_add(n, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_inserted: self.documents_inserted.load(Ordering::Relaxed),
            documents_matched: self.documents_matched.load(Ordering::Relaxed),
            documents_modified: self.documents_modified.load(Ordering::Relaxed),
            documents_deleted: self.documents_deleted.load(Ordering::Relaxed),
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            aggregations_executed: self.aggregations_executed.load(Ordering::Relaxed),
            bulk_writes: self.bulk_writes.load(Ordering::Relaxed),
            bulk_operation_failures: self.bulk_operation_failures.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub documents_inserted: u64,
    pub documents_matched: u64,
    pub documents_modified: u64,
    pub documents_deleted: u64,
    pub queries_executed: u64,
    pub aggregations_executed: u64,
    pub bulk_writes: u64,
    pub bulk_operation_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        assert_eq!(MetricsRegistry::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_increment_counters() {
        let registry = MetricsRegistry::new();

        registry.add_inserted(3);
        registry.add_matched(2);
        registry.add_modified(1);
        registry.add_deleted(4);
        registry.increment_queries_executed();
        registry.increment_aggregations();
        registry.increment_bulk_writes();
        registry.add_bulk_failures(2);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.documents_inserted, 3);
        assert_eq!(snapshot.documents_matched, 2);
        assert_eq!(snapshot.documents_modified, 1);
        assert_eq!(snapshot.documents_deleted, 4);
        assert_eq!(snapshot.queries_executed, 1);
        assert_eq!(snapshot.aggregations_executed, 1);
        assert_eq!(snapshot.bulk_writes, 1);
        assert_eq!(snapshot.bulk_operation_failures, 2);
    }

    #[test]
    fn test_snapshot_serializes() {
        let registry = MetricsRegistry::new();
        registry.add_inserted(1234);

        let json = serde_json::to_value(registry.snapshot()).unwrap();
        assert_eq!(json["documents_inserted"], 1234);
        assert_eq!(json["queries_executed"], 0);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(MetricsRegistry::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let reg = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    reg.add_inserted(1);
                    reg.increment_queries_executed();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.documents_inserted, 1000);
        assert_eq!(snapshot.queries_executed, 1000);
    }
}
