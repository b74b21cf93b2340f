//! Store fixtures.

use bytes::Bytes;
use std::path::Path;
use tasksync_core::{ClientId, StoreConfig, SyncStore, VersionId};
use tempfile::TempDir;

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: SyncStore,
    config: StoreConfig,
    /// Kept alive so the directory outlives the store.
    temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates an in-memory store.
    pub fn memory() -> Self {
        Self::memory_with(StoreConfig::default())
    }

    /// Creates an in-memory store with a custom configuration.
    pub fn memory_with(config: StoreConfig) -> Self {
        Self {
            store: SyncStore::in_memory(config.clone()),
            config,
            temp_dir: None,
        }
    }

    /// Creates a store in a fresh temporary data directory.
    pub fn disk() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = StoreConfig::default();
        let store =
            SyncStore::open_dir(temp_dir.path(), config.clone()).expect("Failed to open store");
        Self {
            store,
            config,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the data directory if on disk.
    pub fn path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Closes the store and opens the same data directory again.
    ///
    /// # Panics
    ///
    /// Panics for in-memory stores.
    pub fn reopen(self) -> Self {
        let Self {
            store,
            config,
            temp_dir,
        } = self;
        let temp_dir = temp_dir.expect("Only disk stores can be reopened");
        store.close().expect("Failed to close store");
        drop(store);

        let store =
            SyncStore::open_dir(temp_dir.path(), config.clone()).expect("Failed to reopen store");
        Self {
            store,
            config,
            temp_dir: Some(temp_dir),
        }
    }
}

impl std::ops::Deref for TestStore {
    type Target = SyncStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary in-memory store.
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&SyncStore) -> R,
{
    let store = TestStore::memory();
    f(&store)
}

/// Runs a test with a store in a temporary data directory.
pub fn with_disk_store<F, R>(f: F) -> R
where
    F: FnOnce(&SyncStore) -> R,
{
    let store = TestStore::disk();
    f(&store)
}

/// Appends `count` versions on top of the client's latest one.
///
/// Returns the payloads in commit order.
pub fn seed_versions(store: &SyncStore, client: ClientId, count: usize) -> Vec<Bytes> {
    let mut parent = store.latest_version(client).expect("Failed to read latest");
    let base = parent.as_u64();
    (0..count as u64)
        .map(|i| {
            let payload = Bytes::from(format!("{client}/segment-{}", base + 1 + i));
            let outcome = store
                .append_batch(client, parent, payload.clone())
                .expect("Failed to seed version");
            parent = outcome.version;
            payload
        })
        .collect()
}

/// Reads the client's whole history from the nil version.
pub fn full_history(store: &SyncStore, client: ClientId) -> Vec<Bytes> {
    store
        .read_batches(client, VersionId::NIL, None)
        .expect("Failed to read history")
        .into_iter()
        .map(|batch| batch.payload)
        .collect()
}
