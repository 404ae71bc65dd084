//! Consolidates every persisted batch into one index sorted by popularity.

use chrono::Utc;
use fred_metadata_series_models::{IndexEntry, SeriesIndex};
use fred_metadata_storage::{StorageError, keys, put_json};

use crate::HarvestContext;
use crate::batch::BatchPersister;

/// Builds the series index from stored batches.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    context: HarvestContext,
    batches: BatchPersister,
}

impl IndexBuilder {
    #[must_use]
    pub fn new(context: HarvestContext) -> Self {
        Self {
            batches: BatchPersister::new(context.clone()),
            context,
        }
    }

    /// Reads batches `0..total_batches`, ranks their records, and writes
    /// the index, replacing any earlier one.
    ///
    /// Batches that are missing or unreadable are skipped. Pages with no
    /// important series never produce a batch, so gaps are normal.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the index itself cannot be written.
    pub async fn build(&self, total_batches: u64) -> Result<SeriesIndex, StorageError> {
        log::info!("Creating consolidated index from {total_batches} batches");

        let mut entries = Vec::new();
        for batch_number in 0..total_batches {
            match self.batches.load(batch_number).await {
                Ok(Some(batch)) => entries.extend(batch.series.iter().map(IndexEntry::from)),
                Ok(None) => log::debug!("Batch {batch_number} not present, skipping"),
                Err(e) => log::warn!("Could not read batch {batch_number}: {e}"),
            }
        }

        rank_by_popularity(&mut entries);

        let index = SeriesIndex {
            count: entries.len(),
            last_updated: Utc::now(),
            series: entries,
        };

        put_json(
            self.context.store(),
            &keys::series_index(self.context.prefix()),
            &index,
        )
        .await?;

        log::info!("Created index with {} important series", index.count);
        Ok(index)
    }
}

/// Sorts by descending popularity. Equal popularity keeps encounter order.
pub fn rank_by_popularity(entries: &mut [IndexEntry]) {
    entries.sort_by(|a, b| b.popularity.cmp(&a.popularity));
}
