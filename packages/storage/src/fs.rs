//! Object store backed by a local directory.
//!
//! Keys map directly onto relative paths, so `prefix/batches/batch_0.json`
//! ends up at `{root}/prefix/batches/batch_0.json`.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::{ObjectStore, StorageError};

/// An [`ObjectStore`] rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Creates a store rooted at `root`. The directory is created on the
    /// first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ObjectStore for FsStore {
    fn location(&self, key: &str) -> String {
        self.path_for(key).display().to_string()
    }

    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let put_err = |e: std::io::Error| StorageError::Put {
            location: path.display().to_string(),
            source: Box::new(e),
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(put_err)?;
        }

        // Write-then-rename so a reader never sees a half-written document.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await.map_err(put_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(put_err)?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key);

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Get {
                location: path.display().to_string(),
                source: Box::new(e),
            }),
        }
    }
}
