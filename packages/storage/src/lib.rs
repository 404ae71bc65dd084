#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Durable object storage for harvested series metadata.
//!
//! Everything the harvester writes is a JSON document stored under a
//! deterministic key (see [`keys`]). Writes overwrite whatever is already
//! at the key, so re-running a step after a crash never duplicates data.
//!
//! Three backends implement [`ObjectStore`]:
//!
//! | Backend | Use |
//! |---|---|
//! | [`S3Store`] | AWS S3 or any S3-compatible endpoint |
//! | [`FsStore`] | A local directory, for development runs |
//! | [`MemoryStore`] | Tests |
//!
//! # Environment Variables
//!
//! | Variable | Required | Description |
//! |---|---|---|
//! | `S3_ENDPOINT_URL` | No | Custom S3-compatible endpoint (path-style addressing) |
//!
//! Credentials and region come from the standard AWS provider chain
//! (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_REGION`, profiles,
//! instance metadata).

pub mod fs;
pub mod keys;
pub mod memory;
pub mod s3;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use fs::FsStore;
pub use memory::MemoryStore;
pub use s3::S3Store;

/// Content type of every document the harvester writes.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading an object failed.
    #[error("Failed to read {location}: {source}")]
    Get {
        /// Where the object lives (e.g. `s3://bucket/key`).
        location: String,
        /// Underlying backend error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Writing an object failed.
    #[error("Failed to write {location}: {source}")]
    Put {
        /// Where the object lives (e.g. `s3://bucket/key`).
        location: String,
        /// Underlying backend error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A stored object is not the JSON document it should be.
    #[error("Invalid JSON in {location}: {source}")]
    Decode {
        /// Where the object lives.
        location: String,
        /// Parse failure.
        source: serde_json::Error,
    },

    /// A value could not be serialized for storage.
    #[error("Failed to serialize document: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Key-value storage over byte blobs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Human-readable location of `key`, used in logs and errors.
    fn location(&self, key: &str) -> String;

    /// Stores `body` at `key`, replacing any existing object.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Put`] if the backend rejects the write.
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    /// Reads the object at `key`. A missing object is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Get`] if the backend fails for any reason
    /// other than the object not existing.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
}

/// Serializes `value` as pretty-printed JSON and stores it at `key`.
///
/// # Errors
///
/// Returns [`StorageError::Encode`] if serialization fails, or the
/// backend's error if the write fails.
pub async fn put_json<T: Serialize + Sync>(
    store: &dyn ObjectStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let body = serde_json::to_vec_pretty(value)?;
    store.put(key, body, JSON_CONTENT_TYPE).await?;
    log::info!("Successfully stored data at {}", store.location(key));
    Ok(())
}

/// Reads and parses the JSON document at `key`.
///
/// Returns `Ok(None)` when nothing is stored there.
///
/// # Errors
///
/// Returns the backend's error if the read fails, or
/// [`StorageError::Decode`] if the object is not valid JSON for `T`.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn ObjectStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(body) = store.get(key).await? else {
        return Ok(None);
    };

    serde_json::from_slice(&body)
        .map(Some)
        .map_err(|source| StorageError::Decode {
            location: store.location(key),
            source,
        })
}
