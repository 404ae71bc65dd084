//! Writes filtered pages to storage, one document per batch number.

use fred_metadata_series_models::{BatchDocument, SeriesRecord};
use fred_metadata_storage::{StorageError, get_json, keys, put_json};

use crate::HarvestContext;

/// Persists batches of important series.
///
/// The key of a batch depends only on its number, so persisting the same
/// number again replaces the earlier document.
#[derive(Debug, Clone)]
pub struct BatchPersister {
    context: HarvestContext,
}

impl BatchPersister {
    #[must_use]
    pub const fn new(context: HarvestContext) -> Self {
        Self { context }
    }

    /// Writes `records` as batch `batch_number`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the write fails.
    pub async fn persist(
        &self,
        batch_number: u64,
        records: Vec<SeriesRecord>,
    ) -> Result<(), StorageError> {
        let key = keys::batch(self.context.prefix(), batch_number);
        put_json(self.context.store(), &key, &BatchDocument::new(records)).await
    }

    /// Reads batch `batch_number` back. `Ok(None)` if it was never written.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the read fails or the document is
    /// corrupt.
    pub async fn load(&self, batch_number: u64) -> Result<Option<BatchDocument>, StorageError> {
        let key = keys::batch(self.context.prefix(), batch_number);
        get_json(self.context.store(), &key).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fred_metadata_storage::MemoryStore;

    use super::*;

    fn series(id: &str) -> SeriesRecord {
        SeriesRecord {
            id: Some(id.to_string()),
            ..SeriesRecord::default()
        }
    }

    #[tokio::test]
    async fn writes_count_and_records() {
        let store = Arc::new(MemoryStore::new());
        let persister = BatchPersister::new(HarvestContext::new(store.clone(), "p"));

        persister
            .persist(0, vec![series("GDP"), series("UNRATE")])
            .await
            .unwrap();

        let doc = persister.load(0).await.unwrap().unwrap();
        assert_eq!(doc.count, 2);
        assert_eq!(doc.series[1].id.as_deref(), Some("UNRATE"));
        assert_eq!(store.keys(), vec!["p/batches/batch_0.json".to_string()]);
    }

    #[tokio::test]
    async fn persisting_same_batch_twice_keeps_only_latest() {
        let store = Arc::new(MemoryStore::new());
        let persister = BatchPersister::new(HarvestContext::new(store.clone(), "p"));

        persister.persist(4, vec![series("OLD")]).await.unwrap();
        persister
            .persist(4, vec![series("NEW1"), series("NEW2")])
            .await
            .unwrap();

        let doc = persister.load(4).await.unwrap().unwrap();
        let ids: Vec<_> = doc.series.iter().filter_map(|s| s.id.as_deref()).collect();
        assert_eq!(ids, vec!["NEW1", "NEW2"]);
        assert_eq!(store.keys_with_prefix("p/batches/").len(), 1);
    }

    #[tokio::test]
    async fn unwritten_batch_is_none() {
        let persister =
            BatchPersister::new(HarvestContext::new(Arc::new(MemoryStore::new()), "p"));
        assert!(persister.load(9).await.unwrap().is_none());
    }
}
