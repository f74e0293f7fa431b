//! Record store facade and recovery.

use crate::config::StoreConfig;
use crate::dir::{self, StoreDir};
use crate::error::{StoreError, StoreOpenError, StoreResult};
use crate::log::{LogRecord, RecordLog};
use crate::manifest::Manifest;
use crate::record::Record;
use crate::schema::{CollectionSpec, Schema, UpgradeTransaction};
use crate::storage::{FileBackend, InMemoryBackend, StorageBackend};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// A persistent, versioned store of keyed record collections.
///
/// `RecordStore` is a cheap handle: clones share the same open store.
///
/// # Opening
///
/// ```rust,ignore
/// use medialab_store::{RecordStore, Schema};
///
/// let schema = Schema::new(1)
///     .collection("users", "email")
///     .collection("settings", "key");
/// let store = RecordStore::open_schema("lab-data", &schema).await?;
/// ```
///
/// The store opens at `max(persisted version, desired version)`. It never
/// downgrades: asking for an older version opens at the persisted one and
/// runs no upgrade.
///
/// # Atomicity
///
/// Each call is atomic: a write appends its log frame and updates the
/// in-memory table under one lock, so readers see the state before or after
/// it. There are no cross-call transactions; concurrent read-modify-write
/// cycles on the same key are last-writer-wins.
#[derive(Clone)]
pub struct RecordStore {
    inner: Arc<StoreInner>,
}

/// Per-collection statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    /// Collection name.
    pub name: String,
    /// Key path.
    pub key_path: String,
    /// Number of live records.
    pub records: usize,
}

/// Store-wide statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Current schema version.
    pub schema_version: u64,
    /// Collections sorted by name.
    pub collections: Vec<CollectionStats>,
    /// Record log size in bytes.
    pub log_bytes: u64,
}

/// Result of a log compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionStats {
    /// Log size before compaction.
    pub bytes_before: u64,
    /// Log size after compaction.
    pub bytes_after: u64,
    /// Live records written back.
    pub records: usize,
}

struct Table {
    key_path: String,
    records: HashMap<String, Record>,
}

struct StoreInner {
    path: Option<PathBuf>,
    dir: Mutex<Option<StoreDir>>,
    manifest: Manifest,
    tables: RwLock<HashMap<String, Table>>,
    log: Mutex<RecordLog>,
    closed: AtomicBool,
}

async fn run_blocking<T, F>(f: F) -> StoreResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> StoreResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
}

impl RecordStore {
    /// Opens (or creates) the store at `path`.
    ///
    /// Resolves `final = max(persisted version or 0, desired_version)`. When
    /// `final` is above the persisted version (including first creation),
    /// `upgrade` runs exactly once before this returns; its staged collections
    /// and the new version are committed with one atomic manifest write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] if the store is unavailable, locked by
    /// another handle, corrupted, resolves to version 0, or the upgrade fails.
    pub async fn open<F>(path: impl AsRef<Path>, desired_version: u64, upgrade: F) -> StoreResult<Self>
    where
        F: FnOnce(&mut UpgradeTransaction<'_>) -> StoreResult<()> + Send + 'static,
    {
        Self::open_with_config(path, StoreConfig::default(), desired_version, upgrade).await
    }

    /// Opens the store at `path` with custom configuration.
    pub async fn open_with_config<F>(
        path: impl AsRef<Path>,
        config: StoreConfig,
        desired_version: u64,
        upgrade: F,
    ) -> StoreResult<Self>
    where
        F: FnOnce(&mut UpgradeTransaction<'_>) -> StoreResult<()> + Send + 'static,
    {
        let path = path.as_ref().to_path_buf();
        let inner = run_blocking(move || {
            StoreInner::open_dir(path, config, desired_version, upgrade)
                .map_err(StoreError::into_open_error)
        })
        .await?;
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Opens the store at `path`, creating whatever `schema` requires.
    pub async fn open_schema(path: impl AsRef<Path>, schema: &Schema) -> StoreResult<Self> {
        Self::open_schema_with_config(path, StoreConfig::default(), schema).await
    }

    /// Opens the store at `path` with custom configuration and a declarative schema.
    pub async fn open_schema_with_config(
        path: impl AsRef<Path>,
        config: StoreConfig,
        schema: &Schema,
    ) -> StoreResult<Self> {
        let schema = schema.clone();
        let version = schema.version();
        Self::open_with_config(path, config, version, move |tx| schema.apply(tx)).await
    }

    /// Opens a store over caller-supplied backends.
    ///
    /// Nothing is locked; the caller owns exclusivity of the backends.
    pub fn open_with_backends<F>(
        config: StoreConfig,
        manifest_backend: Box<dyn StorageBackend>,
        log_backend: Box<dyn StorageBackend>,
        desired_version: u64,
        upgrade: F,
    ) -> StoreResult<Self>
    where
        F: FnOnce(&mut UpgradeTransaction<'_>) -> StoreResult<()>,
    {
        let inner = StoreInner::open(
            None,
            None,
            config,
            manifest_backend,
            log_backend,
            desired_version,
            upgrade,
        )
        .map_err(StoreError::into_open_error)?;
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Opens a fresh in-memory store.
    pub fn open_in_memory(schema: &Schema) -> StoreResult<Self> {
        Self::open_with_backends(
            StoreConfig::default(),
            Box::new(InMemoryBackend::new()),
            Box::new(InMemoryBackend::new()),
            schema.version(),
            |tx| schema.apply(tx),
        )
    }

    /// Reads the persisted schema version at `path` without opening the store.
    ///
    /// Returns `None` if no store has been created there yet.
    pub async fn probe_version(path: impl AsRef<Path>) -> StoreResult<Option<u64>> {
        let path = path.as_ref().to_path_buf();
        run_blocking(move || dir::read_version(&path)).await
    }

    /// Returns the schema version the store is open at.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.manifest.schema_version
    }

    /// Returns the store directory, if file-backed.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Returns every collection, sorted by name.
    #[must_use]
    pub fn collections(&self) -> Vec<CollectionSpec> {
        self.inner
            .manifest
            .collections
            .iter()
            .map(|(name, key_path)| CollectionSpec::new(name.clone(), key_path.clone()))
            .collect()
    }

    /// Returns true if the collection exists.
    #[must_use]
    pub fn has_collection(&self, name: &str) -> bool {
        self.inner.manifest.collections.contains_key(name)
    }

    /// Upserts `record` into `collection`, keyed by the collection's key path.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UnknownCollection`] if the collection was never created
    /// - [`StoreError::MissingKey`] if the record has no text key
    /// - [`StoreError::Codec`] if the encoded record couldn't be read back,
    ///   e.g. nesting beyond the decoder's depth limit
    pub async fn put(&self, collection: &str, record: Record) -> StoreResult<()> {
        let inner = Arc::clone(&self.inner);
        let collection = collection.to_owned();
        run_blocking(move || inner.put(&collection, record)).await
    }

    /// Returns the record stored under `key`, or `None`.
    pub async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Record>> {
        self.inner.get(collection, key)
    }

    /// Returns every record in `collection`, in no particular order.
    pub async fn get_all(&self, collection: &str) -> StoreResult<Vec<Record>> {
        self.inner.get_all(collection)
    }

    /// Removes the record stored under `key`; absent keys are a no-op.
    pub async fn delete(&self, collection: &str, key: &str) -> StoreResult<()> {
        let inner = Arc::clone(&self.inner);
        let collection = collection.to_owned();
        let key = key.to_owned();
        run_blocking(move || inner.delete(&collection, &key)).await
    }

    /// Serializes `value` and upserts it.
    pub async fn put_typed<T: Serialize + ?Sized>(&self, collection: &str, value: &T) -> StoreResult<()> {
        self.put(collection, Record::from_typed(value)?).await
    }

    /// Fetches and deserializes the record stored under `key`.
    pub async fn get_typed<T: DeserializeOwned>(
        &self,
        collection: &str,
        key: &str,
    ) -> StoreResult<Option<T>> {
        self.get(collection, key)
            .await?
            .map(|record| record.to_typed())
            .transpose()
    }

    /// Fetches and deserializes every record in `collection`.
    pub async fn get_all_typed<T: DeserializeOwned>(&self, collection: &str) -> StoreResult<Vec<T>> {
        self.get_all(collection)
            .await?
            .iter()
            .map(Record::to_typed)
            .collect()
    }

    /// Rewrites the log so it holds exactly one frame per live record.
    pub async fn compact(&self) -> StoreResult<CompactionStats> {
        let inner = Arc::clone(&self.inner);
        run_blocking(move || inner.compact()).await
    }

    /// Returns collection counts and the log size.
    pub fn stats(&self) -> StoreResult<StoreStats> {
        self.inner.stats()
    }

    /// Syncs the log and releases the directory lock.
    ///
    /// Every operation on this store (and its clones) fails with
    /// [`StoreError::Closed`] afterwards.
    pub async fn close(&self) -> StoreResult<()> {
        let inner = Arc::clone(&self.inner);
        run_blocking(move || inner.close()).await
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("path", &self.inner.path)
            .field("version", &self.inner.manifest.schema_version)
            .field("closed", &self.inner.closed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl StoreInner {
    fn open_dir<F>(path: PathBuf, config: StoreConfig, desired_version: u64, upgrade: F) -> StoreResult<Self>
    where
        F: FnOnce(&mut UpgradeTransaction<'_>) -> StoreResult<()>,
    {
        let dir = StoreDir::open(&path, config.create_if_missing)?;
        let manifest_backend = FileBackend::open(&dir.manifest_path())?;
        let log_backend = FileBackend::open(&dir.log_path())?;

        Self::open(
            Some(path),
            Some(dir),
            config,
            Box::new(manifest_backend),
            Box::new(log_backend),
            desired_version,
            upgrade,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn open<F>(
        path: Option<PathBuf>,
        dir: Option<StoreDir>,
        config: StoreConfig,
        mut manifest_backend: Box<dyn StorageBackend>,
        log_backend: Box<dyn StorageBackend>,
        desired_version: u64,
        upgrade: F,
    ) -> StoreResult<Self>
    where
        F: FnOnce(&mut UpgradeTransaction<'_>) -> StoreResult<()>,
    {
        let stored = manifest_backend.read_all()?;
        let mut manifest = if stored.is_empty() {
            Manifest::default()
        } else {
            Manifest::decode(&stored)?
        };

        let existing_version = manifest.schema_version;
        let final_version = existing_version.max(desired_version);
        if final_version == 0 {
            return Err(StoreOpenError::InvalidVersion(desired_version).into());
        }

        if final_version > existing_version {
            let created = {
                let mut tx = UpgradeTransaction::new(&manifest, final_version);
                upgrade(&mut tx).map_err(|e| StoreOpenError::UpgradeFailed {
                    version: final_version,
                    reason: e.to_string(),
                })?;
                tx.into_created()
            };

            let created_count = created.len();
            for spec in created {
                manifest.collections.insert(spec.name, spec.key_path);
            }
            manifest.schema_version = final_version;
            manifest_backend.replace(&manifest.encode()?)?;

            info!(
                from = existing_version,
                to = final_version,
                created = created_count,
                "schema upgraded"
            );
        } else if desired_version < existing_version {
            info!(
                desired = desired_version,
                stored = existing_version,
                "store is newer than requested; opening at stored version"
            );
        }

        let mut log = RecordLog::new(log_backend, config.sync_on_write);
        let replay = log.replay()?;
        let frames = replay.records.len();

        let mut tables: HashMap<String, Table> = manifest
            .collections
            .iter()
            .map(|(name, key_path)| {
                (
                    name.clone(),
                    Table {
                        key_path: key_path.clone(),
                        records: HashMap::new(),
                    },
                )
            })
            .collect();

        for entry in replay.records {
            let table = tables.get_mut(entry.collection()).ok_or_else(|| {
                StoreError::corrupted(
                    0,
                    format!("log references unknown collection {}", entry.collection()),
                )
            })?;
            match entry {
                LogRecord::Put { key, value, .. } => {
                    table.records.insert(key, Record::decode(&value)?);
                }
                LogRecord::Delete { key, .. } => {
                    table.records.remove(&key);
                }
            }
        }

        let live: usize = tables.values().map(|t| t.records.len()).sum();
        debug!(frames, live, "record log replayed");

        if config.compact_on_open_frames > 0
            && frames as u64 >= config.compact_on_open_frames
            && live * 2 <= frames
        {
            let before = log.size()?;
            log.rewrite(&live_frames(&tables)?)?;
            info!(before, after = log.size()?, live, "compacted record log on open");
        }

        Ok(Self {
            path,
            dir: Mutex::new(dir),
            manifest,
            tables: RwLock::new(tables),
            log: Mutex::new(log),
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn put(&self, collection: &str, record: Record) -> StoreResult<()> {
        // Checked under the write lock so a concurrent close can't slip in.
        let mut tables = self.tables.write();
        self.ensure_open()?;
        let table = tables
            .get_mut(collection)
            .ok_or_else(|| StoreError::unknown_collection(collection))?;

        let key = record
            .key(&table.key_path)
            .ok_or_else(|| StoreError::MissingKey {
                collection: collection.to_owned(),
                key_path: table.key_path.clone(),
            })?
            .to_owned();

        // Replay must be able to read back whatever is appended.
        let value = record.encode()?;
        Record::decode(&value)?;

        let entry = LogRecord::Put {
            collection: collection.to_owned(),
            key: key.clone(),
            value,
        };
        self.log.lock().append(&entry)?;
        table.records.insert(key, record);
        Ok(())
    }

    fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Record>> {
        self.ensure_open()?;
        let tables = self.tables.read();
        let table = tables
            .get(collection)
            .ok_or_else(|| StoreError::unknown_collection(collection))?;
        Ok(table.records.get(key).cloned())
    }

    fn get_all(&self, collection: &str) -> StoreResult<Vec<Record>> {
        self.ensure_open()?;
        let tables = self.tables.read();
        let table = tables
            .get(collection)
            .ok_or_else(|| StoreError::unknown_collection(collection))?;
        Ok(table.records.values().cloned().collect())
    }

    fn delete(&self, collection: &str, key: &str) -> StoreResult<()> {
        let mut tables = self.tables.write();
        self.ensure_open()?;
        let table = tables
            .get_mut(collection)
            .ok_or_else(|| StoreError::unknown_collection(collection))?;

        if !table.records.contains_key(key) {
            return Ok(());
        }

        let entry = LogRecord::Delete {
            collection: collection.to_owned(),
            key: key.to_owned(),
        };
        self.log.lock().append(&entry)?;
        table.records.remove(key);
        Ok(())
    }

    fn compact(&self) -> StoreResult<CompactionStats> {
        self.ensure_open()?;
        // Writers are held off for the whole rewrite.
        let tables = self.tables.write();
        let frames = live_frames(&tables)?;

        let mut log = self.log.lock();
        let bytes_before = log.size()?;
        log.rewrite(&frames)?;
        let bytes_after = log.size()?;

        info!(bytes_before, bytes_after, records = frames.len(), "compacted record log");
        Ok(CompactionStats {
            bytes_before,
            bytes_after,
            records: frames.len(),
        })
    }

    fn stats(&self) -> StoreResult<StoreStats> {
        self.ensure_open()?;
        let tables = self.tables.read();
        let mut collections: Vec<CollectionStats> = tables
            .iter()
            .map(|(name, table)| CollectionStats {
                name: name.clone(),
                key_path: table.key_path.clone(),
                records: table.records.len(),
            })
            .collect();
        collections.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(StoreStats {
            schema_version: self.manifest.schema_version,
            collections,
            log_bytes: self.log.lock().size()?,
        })
    }

    fn close(&self) -> StoreResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        // Wait out in-flight writers before syncing.
        let _tables = self.tables.write();
        self.log.lock().sync()?;
        self.dir.lock().take();
        debug!(path = ?self.path, "store closed");
        Ok(())
    }
}

fn live_frames(tables: &HashMap<String, Table>) -> StoreResult<Vec<LogRecord>> {
    let mut frames = Vec::new();
    for (name, table) in tables {
        for (key, record) in &table.records {
            frames.push(LogRecord::Put {
                collection: name.clone(),
                key: key.clone(),
                value: record.encode()?,
            });
        }
    }
    frames.sort_by(|a, b| (a.collection(), a.key()).cmp(&(b.collection(), b.key())));
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ciborium::Value;

    fn schema() -> Schema {
        Schema::new(1)
            .collection("users", "email")
            .collection("settings", "key")
    }

    fn user(email: &str, name: &str) -> Record {
        Record::new(Value::Map(vec![
            (Value::Text("email".into()), Value::Text(email.into())),
            (Value::Text("name".into()), Value::Text(name.into())),
        ]))
    }

    #[tokio::test]
    async fn in_memory_crud() {
        let store = RecordStore::open_in_memory(&schema()).unwrap();
        assert_eq!(store.version(), 1);

        store.put("users", user("a@x", "Ada")).await.unwrap();
        assert_eq!(store.get("users", "a@x").await.unwrap(), Some(user("a@x", "Ada")));

        store.delete("users", "a@x").await.unwrap();
        assert_eq!(store.get("users", "a@x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_collection_everywhere() {
        let store = RecordStore::open_in_memory(&schema()).unwrap();
        let is_unknown = |r: &StoreError| matches!(r, StoreError::UnknownCollection { .. });

        assert!(is_unknown(&store.put("files", user("a", "b")).await.unwrap_err()));
        assert!(is_unknown(&store.get("files", "a").await.unwrap_err()));
        assert!(is_unknown(&store.get_all("files").await.unwrap_err()));
        assert!(is_unknown(&store.delete("files", "a").await.unwrap_err()));
    }

    #[tokio::test]
    async fn missing_key_rejected() {
        let store = RecordStore::open_in_memory(&schema()).unwrap();
        let record = Record::new(Value::Map(vec![(
            Value::Text("name".into()),
            Value::Text("nobody".into()),
        )]));
        let err = store.put("users", record).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingKey { ref key_path, .. } if key_path == "email"));
    }

    #[tokio::test]
    async fn version_zero_is_invalid_for_new_store() {
        let result = RecordStore::open_with_backends(
            StoreConfig::default(),
            Box::new(InMemoryBackend::new()),
            Box::new(InMemoryBackend::new()),
            0,
            |_tx| Ok(()),
        );
        assert!(matches!(
            result,
            Err(StoreError::Open(StoreOpenError::InvalidVersion(0)))
        ));
    }

    #[tokio::test]
    async fn stats_and_close() {
        let store = RecordStore::open_in_memory(&schema()).unwrap();
        store.put("users", user("a@x", "Ada")).await.unwrap();
        store.put("users", user("b@x", "Bo")).await.unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.schema_version, 1);
        assert_eq!(stats.collections[0].name, "settings");
        assert_eq!(stats.collections[0].records, 0);
        assert_eq!(stats.collections[1].name, "users");
        assert_eq!(stats.collections[1].records, 2);
        assert!(stats.log_bytes > 0);

        store.close().await.unwrap();
        assert!(matches!(
            store.get("users", "a@x").await,
            Err(StoreError::Closed)
        ));
        assert!(matches!(
            store.put("users", user("c@x", "Cy")).await,
            Err(StoreError::Closed)
        ));
        assert!(matches!(
            store.delete("users", "a@x").await,
            Err(StoreError::Closed)
        ));
    }

    #[tokio::test]
    async fn compaction_keeps_live_records() {
        let store = RecordStore::open_in_memory(&schema()).unwrap();
        for i in 0..10 {
            store.put("users", user("a@x", &format!("v{i}"))).await.unwrap();
        }
        store.put("users", user("b@x", "Bo")).await.unwrap();
        store.delete("users", "b@x").await.unwrap();

        let stats = store.compact().await.unwrap();
        assert_eq!(stats.records, 1);
        assert!(stats.bytes_after < stats.bytes_before);
        assert_eq!(store.get("users", "a@x").await.unwrap(), Some(user("a@x", "v9")));
    }
}
