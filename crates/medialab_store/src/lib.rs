//! # MediaLab Store
//!
//! A persistent, versioned store of keyed record collections.
//!
//! A store is a directory holding a manifest (schema version plus the
//! collection registry) and an append-only record log. Collections are
//! created only while upgrading the schema version; once created they hold
//! structured records keyed by a declared field.
//!
//! ## Guarantees
//!
//! - The schema version never goes down. Opening with an older version
//!   opens at the persisted one and runs no upgrade.
//! - An upgrade runs exactly once per version bump, and its collections are
//!   committed together with the new version or not at all.
//! - Every `put`/`delete` is atomic and durable once it returns (with the
//!   default `sync_on_write`).
//! - A torn frame at the end of the log (a crash mid-append) is discarded on
//!   open; any other damage is reported as corruption.
//!
//! ## Example
//!
//! ```rust,no_run
//! use medialab_store::{Record, RecordStore, StoreResult};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!     email: String,
//!     name: String,
//! }
//!
//! # async fn run() -> StoreResult<()> {
//! let store = RecordStore::open("lab-data", 1, |tx| {
//!     tx.ensure_collection("users", "email")?;
//!     Ok(())
//! })
//! .await?;
//!
//! store
//!     .put_typed("users", &User { email: "ada@oakhill.local".into(), name: "Ada".into() })
//!     .await?;
//! let user: Option<User> = store.get_typed("users", "ada@oakhill.local").await?;
//! assert!(user.is_some());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dir;
mod error;
pub mod log;
mod manifest;
mod record;
mod schema;
mod shared;
pub mod storage;
mod store;

pub use config::StoreConfig;
pub use dir::read_version;
pub use error::{StoreError, StoreOpenError, StoreResult};
pub use manifest::Manifest;
pub use record::Record;
pub use schema::{CollectionSpec, Schema, UpgradeTransaction};
pub use shared::SharedStore;
pub use storage::{FileBackend, InMemoryBackend, StorageBackend, StorageError};
pub use store::{CollectionStats, CompactionStats, RecordStore, StoreStats};

/// Re-exported so callers can build records without naming `ciborium`.
pub use ciborium::Value;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
