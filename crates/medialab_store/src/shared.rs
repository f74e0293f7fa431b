//! Lazily opened, process-wide store handle.

use crate::config::StoreConfig;
use crate::error::StoreResult;
use crate::schema::Schema;
use crate::store::RecordStore;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;

/// Opens its store on first use and hands every caller the same handle.
///
/// Concurrent first callers wait on a single open. A failed open is not
/// cached; the next caller retries.
#[derive(Debug)]
pub struct SharedStore {
    path: PathBuf,
    config: StoreConfig,
    schema: Schema,
    cell: OnceCell<RecordStore>,
}

impl SharedStore {
    /// Creates a handle that will open `path` with `schema`.
    pub fn new(path: impl AsRef<Path>, schema: Schema) -> Self {
        Self::with_config(path, StoreConfig::default(), schema)
    }

    /// Creates a handle with custom store configuration.
    pub fn with_config(path: impl AsRef<Path>, config: StoreConfig, schema: Schema) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config,
            schema,
            cell: OnceCell::new(),
        }
    }

    /// Returns the open store, opening it if this is the first call.
    pub async fn get(&self) -> StoreResult<&RecordStore> {
        self.cell
            .get_or_try_init(|| {
                RecordStore::open_schema_with_config(&self.path, self.config.clone(), &self.schema)
            })
            .await
    }

    /// Returns true once the store has been opened.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.cell.initialized()
    }

    /// Returns the store path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn concurrent_callers_share_one_open() {
        let temp = tempdir().unwrap();
        let shared = Arc::new(SharedStore::new(
            temp.path().join("lab"),
            Schema::new(1).collection("users", "email"),
        ));
        assert!(!shared.is_open());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let shared = Arc::clone(&shared);
            handles.push(tokio::spawn(async move {
                shared.get().await.map(RecordStore::version)
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 1);
        }
        assert!(shared.is_open());
    }

    #[tokio::test]
    async fn failed_open_is_retried() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("lab");
        let shared = SharedStore::with_config(
            &path,
            StoreConfig::new().create_if_missing(false),
            Schema::new(1).collection("users", "email"),
        );

        assert!(shared.get().await.is_err());
        assert!(!shared.is_open());

        std::fs::create_dir_all(&path).unwrap();
        assert_eq!(shared.get().await.unwrap().version(), 1);
    }
}
