//! Context configuration.

use std::time::Duration;

/// Configuration for opening a context.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the journal if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to sync the journal after every commit.
    pub sync_on_commit: bool,

    /// Upper bound on how long `save()` may wait for the commit lock and the
    /// journal append together.
    pub commit_timeout: Duration,

    /// Batch size applied to fetches that don't set one.
    pub default_batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_commit: true,
            commit_timeout: Duration::from_secs(5),
            default_batch_size: 0, // unbatched
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the journal if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to sync the journal on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the commit timeout.
    #[must_use]
    pub const fn commit_timeout(mut self, timeout: Duration) -> Self {
        self.commit_timeout = timeout;
        self
    }

    /// Sets the default fetch batch size.
    #[must_use]
    pub const fn default_batch_size(mut self, size: usize) -> Self {
        self.default_batch_size = size;
        self
    }
}
