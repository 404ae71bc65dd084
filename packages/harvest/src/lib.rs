#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Resumable, time-boxed harvest of important FRED series metadata.
//!
//! One invocation of [`Harvester::run`] pages through the
//! `/fred/series/updates` endpoint, keeps the important series, and writes
//! them to object storage one batch per page. Progress is checkpointed so
//! the harvest can stop at any point (time budget, remote failure) and be
//! resumed by a later invocation from the returned [`Checkpoint`].
//!
//! ```text
//! fetch page ──► filter ──► persist batch ──► advance counters ──► time check
//!     │                                                              │
//!     ├─ empty page ──► final checkpoint ──► build index ──► completed
//!     └─ error ──────► error checkpoint ──────────────────► failed
//!                                                    time up ──► paused
//! ```
//!
//! [`Checkpoint`]: fred_metadata_harvest_models::Checkpoint

pub mod batch;
pub mod budget;
pub mod checkpoint;
pub mod config;
pub mod harvester;
pub mod index;
pub mod progress;

use std::sync::Arc;

use fred_metadata_source::SourceError;
use fred_metadata_storage::{ObjectStore, StorageError};

pub use harvester::Harvester;

/// Errors that abort a single harvest iteration.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// The page could not be fetched.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The batch could not be written.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Where a harvest keeps its state: one store and one key prefix.
///
/// Shared by every component that reads or writes harvest documents.
#[derive(Clone)]
pub struct HarvestContext {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl HarvestContext {
    /// Creates a context writing under `prefix` in `store`.
    ///
    /// Trailing slashes on `prefix` are dropped.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, prefix: &str) -> Self {
        Self {
            store,
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    /// The key prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl std::fmt::Debug for HarvestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarvestContext")
            .field("location", &self.store.location(&self.prefix))
            .finish()
    }
}
