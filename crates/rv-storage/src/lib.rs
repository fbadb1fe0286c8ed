//! Host-owned persisted state: editor content, preferences and snapshot
//! history. The preview engine itself never touches this storage.

pub mod history;
pub mod preferences;
pub mod store;

use std::path::PathBuf;

pub use history::SNAPSHOT_LIMIT;
pub use history::Snapshot;
pub use history::SnapshotHistory;
pub use preferences::HostPreferences;
pub use store::KeyValueStore;

/// Environment variable overriding the storage root.
pub const STORAGE_DIR_ENV: &str = "REVELA_STORAGE_DIR";

/// Local storage budget, matching what browsers grant a single origin.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub root: PathBuf,
    /// Upper bound on the summed size of all keys and values.
    pub quota_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            quota_bytes: DEFAULT_QUOTA_BYTES,
        }
    }
}

impl StorageConfig {
    pub fn with_root(mut self, root: PathBuf) -> Self {
        self.root = root;
        self
    }

    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }
}

fn default_storage_root() -> PathBuf {
    if let Some(override_root) = std::env::var_os(STORAGE_DIR_ENV) {
        return PathBuf::from(override_root);
    }

    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".revela")
}
