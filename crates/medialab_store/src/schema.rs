//! Schema versioning and upgrade transactions.
//!
//! A store's collections can only be created inside an
//! [`UpgradeTransaction`], which [`crate::RecordStore::open`] starts when the
//! resolved schema version is higher than the persisted one. The transaction
//! can add collections but has no way to drop or rename one.
//!
//! Most callers describe their collections declaratively with a [`Schema`]
//! and let it diff itself against what already exists:
//!
//! ```
//! use medialab_store::Schema;
//!
//! let schema = Schema::new(2)
//!     .collection("users", "email")
//!     .collection("settings", "key")
//!     .collection("files", "id");
//! assert_eq!(schema.version(), 2);
//! ```

use crate::error::{StoreError, StoreResult};
use crate::manifest::Manifest;
use tracing::{debug, warn};

/// A collection name and the field that keys its records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    /// Collection name.
    pub name: String,
    /// Key path (dotted for nested fields).
    pub key_path: String,
}

impl CollectionSpec {
    /// Creates a collection spec.
    pub fn new(name: impl Into<String>, key_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_path: key_path.into(),
        }
    }

    fn validate(&self) -> StoreResult<()> {
        if self.name.is_empty() {
            return Err(StoreError::invalid_collection("collection name is empty"));
        }
        if self.key_path.is_empty() || self.key_path.split('.').any(str::is_empty) {
            return Err(StoreError::invalid_collection(format!(
                "invalid key path `{}` for collection {}",
                self.key_path, self.name
            )));
        }
        if self.name.len() > usize::from(u16::MAX) || self.key_path.len() > usize::from(u16::MAX) {
            return Err(StoreError::invalid_collection(format!(
                "collection {} definition is too long",
                self.name
            )));
        }
        Ok(())
    }
}

/// The scope in which collections may be created.
///
/// Changes are staged; the store commits them together with the new schema
/// version in one manifest write once the callback returns `Ok`.
#[derive(Debug)]
pub struct UpgradeTransaction<'a> {
    existing: &'a Manifest,
    new_version: u64,
    created: Vec<CollectionSpec>,
}

impl<'a> UpgradeTransaction<'a> {
    pub(crate) fn new(existing: &'a Manifest, new_version: u64) -> Self {
        Self {
            existing,
            new_version,
            created: Vec::new(),
        }
    }

    /// Returns the persisted version before this upgrade (0 for a new store).
    #[must_use]
    pub fn old_version(&self) -> u64 {
        self.existing.schema_version
    }

    /// Returns the version being upgraded to.
    #[must_use]
    pub fn new_version(&self) -> u64 {
        self.new_version
    }

    /// Returns true if the collection exists or was created in this transaction.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.key_path(name).is_some()
    }

    /// Returns the key path of an existing or staged collection.
    #[must_use]
    pub fn key_path(&self, name: &str) -> Option<&str> {
        self.existing.key_path(name).or_else(|| {
            self.created
                .iter()
                .find(|c| c.name == name)
                .map(|c| c.key_path.as_str())
        })
    }

    /// Creates the collection unless it already exists.
    ///
    /// Returns `true` if the collection was created. An existing collection
    /// keeps its original key path even if `key_path` differs.
    pub fn ensure_collection(
        &mut self,
        name: impl Into<String>,
        key_path: impl Into<String>,
    ) -> StoreResult<bool> {
        let spec = CollectionSpec::new(name, key_path);
        spec.validate()?;

        if let Some(current) = self.key_path(&spec.name) {
            if current != spec.key_path {
                warn!(
                    collection = %spec.name,
                    existing = current,
                    requested = %spec.key_path,
                    "collection exists with a different key path; keeping the existing one"
                );
            }
            return Ok(false);
        }

        debug!(collection = %spec.name, key_path = %spec.key_path, "creating collection");
        self.created.push(spec);
        Ok(true)
    }

    /// Returns the collections created so far.
    #[must_use]
    pub fn created(&self) -> &[CollectionSpec] {
        &self.created
    }

    pub(crate) fn into_created(self) -> Vec<CollectionSpec> {
        self.created
    }
}

/// A declarative schema: a version and the collections it requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    version: u64,
    collections: Vec<CollectionSpec>,
}

impl Schema {
    /// Creates an empty schema at `version`.
    #[must_use]
    pub fn new(version: u64) -> Self {
        Self {
            version,
            collections: Vec::new(),
        }
    }

    /// Adds a required collection.
    #[must_use]
    pub fn collection(mut self, name: impl Into<String>, key_path: impl Into<String>) -> Self {
        self.collections.push(CollectionSpec::new(name, key_path));
        self
    }

    /// Returns the schema version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the required collections.
    #[must_use]
    pub fn collections(&self) -> &[CollectionSpec] {
        &self.collections
    }

    /// Creates every missing collection in `tx`.
    pub fn apply(&self, tx: &mut UpgradeTransaction<'_>) -> StoreResult<()> {
        for spec in &self.collections {
            tx.ensure_collection(spec.name.clone(), spec.key_path.clone())?;
        }
        Ok(())
    }

    /// Returns the collections `manifest` is missing.
    #[must_use]
    pub fn missing_from(&self, manifest: &Manifest) -> Vec<&CollectionSpec> {
        self.collections
            .iter()
            .filter(|c| !manifest.collections.contains_key(&c.name))
            .collect()
    }
}
