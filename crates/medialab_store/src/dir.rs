//! Store directory layout and locking.
//!
//! ```text
//! <store>/
//! ├─ MANIFEST      # schema version + collection registry
//! ├─ LOCK          # advisory lock, held while a handle is open
//! └─ records.log   # append-only put/delete log
//! ```

use crate::error::{StoreOpenError, StoreResult};
use crate::manifest::Manifest;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "MANIFEST";
const LOCK_FILE: &str = "LOCK";
const LOG_FILE: &str = "records.log";

/// An opened store directory.
///
/// Holds an exclusive lock on `LOCK` for as long as it lives; a second
/// `StoreDir` on the same path fails with [`StoreOpenError::Locked`].
#[derive(Debug)]
pub struct StoreDir {
    path: PathBuf,
    _lock_file: File,
}

impl StoreDir {
    /// Opens (and optionally creates) a store directory and takes its lock.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the directory is missing and may not be created, or
    ///   any file cannot be opened
    /// - `Locked` if another handle holds the lock
    pub fn open(path: &Path, create_if_missing: bool) -> StoreResult<Self> {
        if !path.exists() {
            if !create_if_missing {
                return Err(StoreOpenError::Unavailable(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("store directory does not exist: {}", path.display()),
                ))
                .into());
            }
            fs::create_dir_all(path).map_err(StoreOpenError::Unavailable)?;
        }

        if !path.is_dir() {
            return Err(StoreOpenError::Unavailable(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("path is not a directory: {}", path.display()),
            ))
            .into());
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))
            .map_err(StoreOpenError::Unavailable)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreOpenError::Locked.into());
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of the MANIFEST file.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.path.join(MANIFEST_FILE)
    }

    /// Returns the path of the record log.
    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.path.join(LOG_FILE)
    }
}

/// Reads the persisted schema version without taking the lock.
///
/// Returns `None` if the directory or its manifest doesn't exist yet.
pub fn read_version(path: &Path) -> StoreResult<Option<u64>> {
    let manifest_path = path.join(MANIFEST_FILE);
    let data = match fs::read(&manifest_path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreOpenError::Unavailable(e).into()),
    };
    if data.is_empty() {
        return Ok(None);
    }
    let manifest = Manifest::decode(&data).map_err(|e| e.into_open_error())?;
    Ok(Some(manifest.schema_version))
}
