//! The lab service.
//!
//! [`Lab`] is the only way the rest of the application touches the store.
//! Its operations are grouped by area:
//!
//! - accounts: users, passwords, sign-in
//! - progress: projects, worksheets, rubric scoring and feedback
//! - threads: comments, notices and checklist preferences
//! - resources: admin assets, stage resources, uploads and stage bundles
//! - exports: CSV, personal data, certificates and the guardian view

mod accounts;
mod exports;
mod progress;
mod resources;
mod threads;

pub use accounts::NewUser;
pub use exports::{GuardianStage, GuardianView, StudentSummary};

use crate::config::LabConfig;
use crate::error::LabResult;
use crate::model::{Role, User};
use crate::password::hash_password;
use crate::schema::{lab_schema, SETTINGS, USERS};
use crate::settings::{Resources, Setting, SettingRecord, UploadPolicy, RESOURCES_KEY, UPLOADS_KEY};
use chrono::Utc;
use medialab_store::RecordStore;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Classroom film-project tracker over a record store.
#[derive(Debug, Clone)]
pub struct Lab {
    store: RecordStore,
    config: LabConfig,
}

impl Lab {
    /// Opens (or creates) the lab store at `path` and seeds defaults.
    pub async fn open(path: impl AsRef<Path>, config: LabConfig) -> LabResult<Self> {
        let store =
            RecordStore::open_schema_with_config(path, config.store.clone(), &lab_schema()).await?;
        let lab = Self { store, config };
        lab.seed_defaults().await?;
        Ok(lab)
    }

    /// Opens an in-memory lab, for tests and demos.
    pub async fn in_memory(config: LabConfig) -> LabResult<Self> {
        let store = RecordStore::open_in_memory(&lab_schema())?;
        let lab = Self { store, config };
        lab.seed_defaults().await?;
        Ok(lab)
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    /// Creates the admin account and the shared settings if they are absent.
    ///
    /// Safe to call on every start; existing records are left alone.
    pub async fn seed_defaults(&self) -> LabResult<()> {
        let admin_email = self.config.admin_email.as_str();
        if self.store.get(USERS, admin_email).await?.is_none() {
            let admin = User {
                email: admin_email.to_owned(),
                name: self.config.admin_name.clone(),
                role: Role::Admin,
                password_hash: hash_password(&self.config.admin_password)?,
                guardian_of: None,
            };
            self.store.put_typed(USERS, &admin).await?;
            info!(email = admin_email, "seeded admin account");
        }

        if self.store.get(SETTINGS, UPLOADS_KEY).await?.is_none() {
            self.put_setting(UPLOADS_KEY, Setting::Uploads(UploadPolicy::default()))
                .await?;
        }
        if self.store.get(SETTINGS, RESOURCES_KEY).await?.is_none() {
            self.put_setting(RESOURCES_KEY, Setting::Resources(Resources::default()))
                .await?;
        }
        Ok(())
    }

    /// Closes the underlying store.
    pub async fn close(&self) -> LabResult<()> {
        self.store.close().await?;
        Ok(())
    }

    async fn setting(&self, key: &str) -> LabResult<Option<Setting>> {
        Ok(self
            .store
            .get_typed::<SettingRecord>(SETTINGS, key)
            .await?
            .map(|record| record.setting))
    }

    async fn put_setting(&self, key: &str, setting: Setting) -> LabResult<()> {
        let record = SettingRecord {
            key: key.to_owned(),
            setting,
        };
        self.store.put_typed(SETTINGS, &record).await?;
        Ok(())
    }
}

/// Generates a record id.
fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Milliseconds since the Unix epoch, strictly increasing within the process.
fn now_millis() -> u64 {
    static LAST: AtomicU64 = AtomicU64::new(0);

    let wall = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
    let mut prev = LAST.load(Ordering::Relaxed);
    loop {
        let next = wall.max(prev + 1);
        match LAST.compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => prev = actual,
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
