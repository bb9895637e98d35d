//! Store: the registry of named collections
//!
//! Owns configuration, logger and metrics, and hands them to every
//! collection it creates. There is no process-wide store; callers create one
//! and pass it around.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::StoreConfig;
use crate::errors::{StoreError, StoreResult};
use crate::observability::{Event, Logger, MetricsRegistry, MetricsSnapshot};

use super::collection::{Collection, CollectionContext};

/// In-memory document store
#[derive(Debug)]
pub struct Store {
    config: StoreConfig,
    logger: Logger,
    metrics: Arc<MetricsRegistry>,
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        let logger = config.logger();
        Self::with_logger(config, logger)
    }

    /// Store whose log lines go to the given logger instead of the
    /// configured target
    pub fn with_logger(config: StoreConfig, logger: Logger) -> Self {
        Self {
            config,
            logger,
            metrics: Arc::new(MetricsRegistry::new()),
            collections: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Handle to the named collection, creating an empty one if absent.
    ///
    /// Repeated calls with the same name return the same collection.
    pub fn get_collection(&self, name: &str) -> StoreResult<Arc<Collection>> {
        validate_name(name)?;

        if let Some(existing) = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(Arc::clone(existing));
        }

        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let collection = collections.entry(name.to_string()).or_insert_with(|| {
            let context = CollectionContext {
                max_document_depth: self.config.max_document_depth,
                logger: self.logger.clone(),
                metrics: Arc::clone(&self.metrics),
            };
            Arc::new(Collection::with_context(name, context))
        });
        Ok(Arc::clone(collection))
    }

    /// Names of collections that have received a document, sorted
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|c| c.is_created())
            .map(|c| c.name().to_string())
            .collect();
        names.sort();
        names
    }

    /// Remove a collection. Outstanding handles keep working but are no
    /// longer reachable through the store.
    pub fn drop_collection(&self, name: &str) -> bool {
        let removed = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);

        if let Some(collection) = &removed {
            self.logger.event(
                Event::CollectionDropped,
                &[("collection", name), ("documents", &collection.len().to_string())],
            );
        }
        removed.is_some()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

fn validate_name(name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::invalid_argument("collection name must not be empty"));
    }
    if name.starts_with('$') || name.contains('\0') {
        return Err(StoreError::invalid_argument(format!(
            "invalid collection name '{}'",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use serde_json::json;

    #[test]
    fn test_get_collection_returns_same_handle() {
        let store = Store::new();
        let a = store.get_collection("users").unwrap();
        let b = store.get_collection("users").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_collection_created_on_first_write() {
        let store = Store::new();
        let users = store.get_collection("users").unwrap();
        store.get_collection("empty").unwrap();
        assert!(store.collection_names().is_empty());

        users
            .insert_one(Document::from_json(json!({"name": "Ann"})).unwrap())
            .unwrap();
        assert_eq!(store.collection_names(), vec!["users".to_string()]);
    }

    #[test]
    fn test_invalid_names() {
        let store = Store::new();
        assert!(store.get_collection("").is_err());
        assert!(store.get_collection("$cmd").is_err());
    }

    #[test]
    fn test_drop_collection() {
        let store = Store::new();
        let users = store.get_collection("users").unwrap();
        users.insert_one(Document::new()).unwrap();

        assert!(store.drop_collection("users"));
        assert!(!store.drop_collection("users"));
        assert!(store.get_collection("users").unwrap().is_empty());
        assert_eq!(users.len(), 1);
    }

    #[test]
    fn test_metrics_shared_across_collections() {
        let store = Store::new();
        store.get_collection("a").unwrap().insert_one(Document::new()).unwrap();
        store.get_collection("b").unwrap().insert_one(Document::new()).unwrap();
        assert_eq!(store.metrics().documents_inserted, 2);
    }
}
