//! Saving and loading harvest checkpoints.
//!
//! Every save writes two copies: the latest checkpoint, which is
//! overwritten each time, and a history copy keyed by the checkpoint's
//! timestamp.

use chrono::Utc;
use fred_metadata_harvest_models::{Checkpoint, Progress};
use fred_metadata_storage::{StorageError, get_json, keys, put_json};

use crate::HarvestContext;

/// Reads and writes checkpoints under a [`HarvestContext`].
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    context: HarvestContext,
}

impl CheckpointManager {
    #[must_use]
    pub const fn new(context: HarvestContext) -> Self {
        Self { context }
    }

    /// Stamps `progress` with the current time and stores it.
    ///
    /// Always returns the checkpoint. A storage failure here is logged and
    /// swallowed, because a save usually happens while reporting some
    /// other failure and must not replace it.
    pub async fn save(
        &self,
        progress: Progress,
        execution_complete: bool,
        error: Option<String>,
    ) -> Checkpoint {
        let checkpoint = Checkpoint::new(progress, execution_complete, error, Utc::now());

        if let Err(e) = self.write(&checkpoint).await {
            log::error!("Failed to store checkpoint: {e}");
        }

        checkpoint
    }

    async fn write(&self, checkpoint: &Checkpoint) -> Result<(), StorageError> {
        let prefix = self.context.prefix();
        let store = self.context.store();

        put_json(store, &keys::latest_checkpoint(prefix), checkpoint).await?;
        put_json(
            store,
            &keys::checkpoint_history(prefix, &checkpoint.timestamp_string()),
            checkpoint,
        )
        .await
    }

    /// Reads the latest checkpoint.
    ///
    /// `Ok(None)` means no harvest has checkpointed under this prefix yet,
    /// so the next run starts fresh.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the read fails or the stored checkpoint
    /// is corrupt.
    pub async fn load(&self) -> Result<Option<Checkpoint>, StorageError> {
        let key = keys::latest_checkpoint(self.context.prefix());
        let checkpoint: Option<Checkpoint> = get_json(self.context.store(), &key).await?;

        match &checkpoint {
            Some(c) => log::info!(
                "Loaded checkpoint from {}: offset={}, batch={}, complete={}",
                self.context.store().location(&key),
                c.offset,
                c.batch_number,
                c.execution_complete
            ),
            None => log::info!("No checkpoint at {}", self.context.store().location(&key)),
        }

        Ok(checkpoint)
    }
}
