//! Byte-level storage backends.
//!
//! Backends are opaque byte stores: the record log and the manifest are
//! both written through this trait, and neither backend knows which one it
//! is holding.

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::InMemoryBackend;

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A truncation asked to grow the storage.
    #[error("cannot truncate to {requested} bytes: storage holds {size}")]
    InvalidTruncate {
        /// The requested size.
        requested: u64,
        /// The current size.
        size: u64,
    },
}

/// A low-level byte store.
///
/// # Invariants
///
/// - `append` returns the offset where the data starts
/// - `read_all` returns every byte appended since the last `replace`/`truncate`
/// - `replace` swaps the whole content atomically: a reader observes either
///   the old bytes or the new bytes, never a mix
pub trait StorageBackend: Send + Sync {
    /// Reads the full content.
    fn read_all(&self) -> StorageResult<Vec<u8>>;

    /// Appends data and returns the offset where it was written.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes buffered writes to the OS.
    fn flush(&mut self) -> StorageResult<()>;

    /// Makes all data and metadata durable.
    fn sync(&mut self) -> StorageResult<()>;

    /// Returns the current size in bytes.
    fn size(&self) -> StorageResult<u64>;

    /// Drops everything after `new_size`.
    ///
    /// # Errors
    ///
    /// Fails with [`StorageError::InvalidTruncate`] if `new_size` exceeds the
    /// current size.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Atomically replaces the whole content with `data`.
    fn replace(&mut self, data: &[u8]) -> StorageResult<()>;
}
