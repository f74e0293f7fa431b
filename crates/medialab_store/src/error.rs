//! Error types for the record store.

use crate::storage::StorageError;
use std::io;
use thiserror::Error;

/// Result type for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Why a store could not be opened.
///
/// All of these are fatal to the caller's startup flow; none is retried by
/// the store itself.
#[derive(Debug, Error)]
pub enum StoreOpenError {
    /// The directory or one of its files could not be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] io::Error),

    /// Another handle holds the store's lock.
    #[error("store is locked by another open handle")]
    Locked,

    /// The manifest or the record log failed validation.
    #[error("store corrupted: {0}")]
    Corrupted(String),

    /// The resolved schema version is not usable.
    #[error("invalid schema version {0}: versions start at 1")]
    InvalidVersion(u64),

    /// The upgrade callback failed; nothing was persisted.
    #[error("upgrade to version {version} failed: {reason}")]
    UpgradeFailed {
        /// The version the upgrade was heading to.
        version: u64,
        /// The callback's error.
        reason: String,
    },
}

/// Errors that can occur in record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Opening the store failed.
    #[error(transparent)]
    Open(#[from] StoreOpenError),

    /// The named collection was never created by an upgrade.
    #[error("unknown collection: {name}")]
    UnknownCollection {
        /// The requested collection.
        name: String,
    },

    /// The record carries no text value at the collection's key path.
    #[error("record for collection {collection} has no text value at key path `{key_path}`")]
    MissingKey {
        /// The target collection.
        collection: String,
        /// The collection's declared key path.
        key_path: String,
    },

    /// A collection definition was rejected.
    #[error("invalid collection definition: {message}")]
    InvalidCollection {
        /// What was wrong with it.
        message: String,
    },

    /// A record could not be converted to or from CBOR.
    #[error("codec error: {0}")]
    Codec(String),

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A log frame or the manifest failed validation.
    #[error("corruption at offset {offset}: {message}")]
    Corrupted {
        /// Byte offset of the bad frame.
        offset: u64,
        /// Description of the problem.
        message: String,
    },

    /// The store has been closed.
    #[error("store is closed")]
    Closed,

    /// A blocking storage task panicked or was cancelled by the runtime.
    #[error("storage task failed: {0}")]
    Task(String),
}

impl StoreError {
    /// Creates an unknown collection error.
    pub fn unknown_collection(name: impl Into<String>) -> Self {
        Self::UnknownCollection { name: name.into() }
    }

    /// Creates an invalid collection error.
    pub fn invalid_collection(message: impl Into<String>) -> Self {
        Self::InvalidCollection {
            message: message.into(),
        }
    }

    /// Creates a corruption error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::Corrupted {
            offset,
            message: message.into(),
        }
    }

    /// Folds an error raised while opening into [`StoreError::Open`].
    ///
    /// I/O failures become `Unavailable` and validation failures become
    /// `Corrupted`, so callers of `open` only ever see one error family.
    pub(crate) fn into_open_error(self) -> Self {
        match self {
            Self::Open(_) => self,
            Self::Storage(StorageError::Io(e)) => StoreOpenError::Unavailable(e).into(),
            Self::Storage(other) => StoreOpenError::Corrupted(other.to_string()).into(),
            Self::Corrupted { .. } | Self::Codec(_) | Self::UnknownCollection { .. } => {
                StoreOpenError::Corrupted(self.to_string()).into()
            }
            other => other,
        }
    }

    /// Returns true if this is an open failure.
    #[must_use]
    pub fn is_open_error(&self) -> bool {
        matches!(self, Self::Open(_))
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        Self::Storage(StorageError::Io(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_failures_open_as_unavailable() {
        let err = StoreError::from(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        let err = err.into_open_error();
        assert!(matches!(
            err,
            StoreError::Open(StoreOpenError::Unavailable(_))
        ));
    }

    #[test]
    fn bad_frames_open_as_corrupted() {
        let err = StoreError::corrupted(42, "bad crc").into_open_error();
        match err {
            StoreError::Open(StoreOpenError::Corrupted(msg)) => {
                assert!(msg.contains("42"));
                assert!(msg.contains("bad crc"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn display_names_collection() {
        let err = StoreError::unknown_collection("files");
        assert_eq!(err.to_string(), "unknown collection: files");
    }
}
