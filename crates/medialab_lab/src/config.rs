//! Lab configuration.

use medialab_store::StoreConfig;

/// Configuration for opening a lab.
#[derive(Debug, Clone)]
pub struct LabConfig {
    /// Email of the account seeded on first start.
    pub admin_email: String,

    /// Display name of the seeded account.
    pub admin_name: String,

    /// Initial password of the seeded account.
    pub admin_password: String,

    /// Notices kept per user; older ones are dropped.
    pub notice_cap: usize,

    /// Record store settings.
    pub store: StoreConfig,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            admin_email: "admin@oakhill.local".into(),
            admin_name: "Admin".into(),
            admin_password: "admin123".into(),
            notice_cap: 20,
            store: StoreConfig::default(),
        }
    }
}

impl LabConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the seeded admin account.
    #[must_use]
    pub fn admin(mut self, email: impl Into<String>, password: impl Into<String>) -> Self {
        self.admin_email = email.into().trim().to_lowercase();
        self.admin_password = password.into();
        self
    }

    /// Sets how many notices each user keeps.
    #[must_use]
    pub const fn notice_cap(mut self, cap: usize) -> Self {
        self.notice_cap = cap;
        self
    }

    /// Sets the record store configuration.
    #[must_use]
    pub fn store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = LabConfig::default();
        assert_eq!(config.admin_email, "admin@oakhill.local");
        assert_eq!(config.notice_cap, 20);
    }

    #[test]
    fn builder() {
        let config = LabConfig::new()
            .admin(" Head@School.Example ", "s3cret")
            .notice_cap(5)
            .store(StoreConfig::new().sync_on_write(false));
        assert_eq!(config.admin_email, "head@school.example");
        assert_eq!(config.admin_password, "s3cret");
        assert_eq!(config.notice_cap, 5);
        assert!(!config.store.sync_on_write);
    }
}
