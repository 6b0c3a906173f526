//! SimContentStore - in-memory store with fault injection

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::backend::ContentStore;
use super::document::{DocumentTable, StoredDocument};
use super::error::{StoreError, StoreResult};
use crate::dst::{Clock, FaultInjector, FaultType};

/// In-memory [`ContentStore`] for tests and simulation.
#[derive(Debug)]
pub struct SimContentStore {
    table: RwLock<DocumentTable>,
    clock: Arc<dyn Clock>,
    faults: FaultInjector,
}

impl SimContentStore {
    /// Create an empty store that never fails.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_faults(clock, FaultInjector::none())
    }

    /// Create an empty store with fault injection.
    #[must_use]
    pub fn with_faults(clock: Arc<dyn Clock>, faults: FaultInjector) -> Self {
        Self {
            table: RwLock::new(DocumentTable::new()),
            clock,
            faults,
        }
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.table.read().await.documents.len()
    }

    /// Whether the store holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_read(&self, section: &str) -> StoreResult<()> {
        if self.faults.should_inject(FaultType::StoreReadFail) {
            return Err(StoreError::read(format!("injected read fault on {section}")));
        }
        Ok(())
    }

    fn check_write(&self, section: &str) -> StoreResult<()> {
        if self.faults.should_inject(FaultType::StoreWriteFail) {
            return Err(StoreError::write(format!("injected write fault on {section}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for SimContentStore {
    async fn get(&self, section: &str) -> StoreResult<Option<StoredDocument>> {
        self.check_read(section)?;
        Ok(self.table.read().await.get(section))
    }

    async fn insert(&self, section: &str, content: &Value) -> StoreResult<StoredDocument> {
        self.check_write(section)?;
        let now = self.clock.now();
        self.table.write().await.insert(section, content, now)
    }

    async fn update(
        &self,
        section: &str,
        content: &Value,
        expected_version: u64,
    ) -> StoreResult<StoredDocument> {
        self.check_write(section)?;
        let now = self.clock.now();
        self.table
            .write()
            .await
            .update(section, content, expected_version, now)
    }

    async fn delete(&self, section: &str) -> StoreResult<bool> {
        self.check_write(section)?;
        Ok(self.table.write().await.delete(section))
    }

    async fn list(&self) -> StoreResult<Vec<StoredDocument>> {
        self.check_read("*")?;
        Ok(self.table.read().await.list())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dst::{FaultConfig, SimClock};
    use serde_json::json;

    fn store() -> (SimContentStore, SimClock) {
        let clock = SimClock::at_ms(10_000);
        (SimContentStore::new(Arc::new(clock.clone())), clock)
    }

    #[tokio::test]
    async fn test_insert_get_update() {
        let (store, clock) = store();

        assert!(store.get("hero").await.unwrap().is_none());

        let inserted = store.insert("hero", &json!({"title": "a"})).await.unwrap();
        assert_eq!(inserted.version, 1);

        clock.advance_ms(1_000);
        let updated = store
            .update("hero", &json!({"title": "b"}), 1)
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.updated_at.timestamp_millis(), 11_000);

        let read = store.get("hero").await.unwrap().unwrap();
        assert_eq!(read.content, json!({"title": "b"}));
    }

    #[tokio::test]
    async fn test_list_is_ordered() {
        let (store, _) = store();
        store.insert("hero", &json!({})).await.unwrap();
        store.insert("faq", &json!({})).await.unwrap();

        let sections: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.section)
            .collect();
        assert_eq!(sections, vec!["faq", "hero"]);
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, _) = store();
        store.insert("hero", &json!({})).await.unwrap();
        assert!(store.delete("hero").await.unwrap());
        assert!(!store.delete("hero").await.unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_read_fault() {
        let faults = FaultInjector::builder(1)
            .with_fault(FaultConfig::always(FaultType::StoreReadFail))
            .build();
        let store = SimContentStore::with_faults(Arc::new(SimClock::new()), faults);

        let err = store.get("hero").await.unwrap_err();
        assert!(matches!(err, StoreError::Read(_)));
    }

    #[tokio::test]
    async fn test_write_fault_leaves_store_unchanged() {
        let faults = FaultInjector::builder(1)
            .with_fault(FaultConfig::always(FaultType::StoreWriteFail))
            .build();
        let store = SimContentStore::with_faults(Arc::new(SimClock::new()), faults);

        tokio_test::assert_err!(store.insert("hero", &json!({})).await);
        assert!(store.is_empty().await);
    }
}
