//! Store configuration.

/// Configuration for opening a record store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Whether to create the store directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to sync the record log after every write (safer but slower).
    pub sync_on_write: bool,

    /// Replayed-frame count above which open compacts the log, provided at
    /// least half of the frames are superseded. 0 disables compaction on open.
    pub compact_on_open_frames: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_write: true,
            compact_on_open_frames: 4096,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the store if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to sync the log on every write.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets the frame threshold for compaction on open.
    #[must_use]
    pub const fn compact_on_open_frames(mut self, frames: u64) -> Self {
        self.compact_on_open_frames = frames;
        self
    }
}
