//! Store configuration.

use crate::snapshot::SnapshotPolicy;

/// Configuration for a [`crate::SyncStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Fsync the version log before acknowledging each append.
    pub sync_on_write: bool,
    /// Largest accepted history segment or snapshot, in bytes.
    pub max_payload_bytes: usize,
    /// When to ask clients for a snapshot.
    pub snapshot_policy: SnapshotPolicy,
}

impl StoreConfig {
    /// Sets whether appends are fsynced before they are acknowledged.
    #[must_use]
    pub fn with_sync_on_write(mut self, sync: bool) -> Self {
        self.sync_on_write = sync;
        self
    }

    /// Sets the maximum payload size.
    #[must_use]
    pub fn with_max_payload_bytes(mut self, max: usize) -> Self {
        self.max_payload_bytes = max;
        self
    }

    /// Sets the snapshot policy.
    #[must_use]
    pub fn with_snapshot_policy(mut self, policy: SnapshotPolicy) -> Self {
        self.snapshot_policy = policy;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sync_on_write: true,
            max_payload_bytes: 100 * 1024 * 1024,
            snapshot_policy: SnapshotPolicy::default(),
        }
    }
}
