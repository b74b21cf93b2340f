//! Where client data lives.

use crate::backend::LogBackend;
use crate::dir::DataDir;
use crate::error::StorageResult;
use crate::file::FileBackend;
use crate::memory::InMemoryBackend;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// Storage for every client's version log and snapshot.
///
/// The sync store opens each client's log at most once and keeps the handle;
/// implementations do not need to cache.
pub trait ClientStorage: Send + Sync {
    /// Opens (creating if needed) the client's version log.
    fn open_log(&self, client: &Uuid) -> StorageResult<Box<dyn LogBackend>>;

    /// Returns true if anything has been stored for the client.
    fn client_exists(&self, client: &Uuid) -> bool;

    /// Lists every client with stored data.
    fn list_clients(&self) -> StorageResult<Vec<Uuid>>;

    /// Replaces the client's snapshot bytes atomically.
    fn write_snapshot(&self, client: &Uuid, bytes: &[u8]) -> StorageResult<()>;

    /// Reads the client's snapshot bytes.
    fn read_snapshot(&self, client: &Uuid) -> StorageResult<Option<Vec<u8>>>;
}

/// Client storage backed by a [`DataDir`].
#[derive(Debug)]
pub struct DiskStorage {
    dir: DataDir,
}

impl DiskStorage {
    /// Wraps an opened data directory.
    #[must_use]
    pub fn new(dir: DataDir) -> Self {
        Self { dir }
    }

    /// Returns the data directory.
    #[must_use]
    pub fn dir(&self) -> &DataDir {
        &self.dir
    }
}

impl ClientStorage for DiskStorage {
    fn open_log(&self, client: &Uuid) -> StorageResult<Box<dyn LogBackend>> {
        let backend = FileBackend::open_with_create_dirs(&self.dir.log_path(client))?;
        Ok(Box::new(backend))
    }

    fn client_exists(&self, client: &Uuid) -> bool {
        self.dir.client_dir(client).is_dir()
    }

    fn list_clients(&self) -> StorageResult<Vec<Uuid>> {
        self.dir.list_clients()
    }

    fn write_snapshot(&self, client: &Uuid, bytes: &[u8]) -> StorageResult<()> {
        self.dir.write_snapshot(client, bytes)
    }

    fn read_snapshot(&self, client: &Uuid) -> StorageResult<Option<Vec<u8>>> {
        self.dir.read_snapshot(client)
    }
}

#[derive(Debug, Default)]
struct MemoryClient {
    log: InMemoryBackend,
    snapshot: Option<Vec<u8>>,
}

/// Client storage that lives entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    clients: RwLock<HashMap<Uuid, MemoryClient>>,
}

impl MemoryStorage {
    /// Creates empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the client's raw log bytes, creating the client.
    ///
    /// Tests use this to corrupt or tear a log before reopening it.
    #[must_use]
    pub fn raw_log(&self, client: &Uuid) -> InMemoryBackend {
        self.clients.write().entry(*client).or_default().log.clone()
    }
}

impl ClientStorage for MemoryStorage {
    fn open_log(&self, client: &Uuid) -> StorageResult<Box<dyn LogBackend>> {
        Ok(Box::new(self.raw_log(client)))
    }

    fn client_exists(&self, client: &Uuid) -> bool {
        self.clients.read().contains_key(client)
    }

    fn list_clients(&self) -> StorageResult<Vec<Uuid>> {
        let mut clients: Vec<Uuid> = self.clients.read().keys().copied().collect();
        clients.sort();
        Ok(clients)
    }

    fn write_snapshot(&self, client: &Uuid, bytes: &[u8]) -> StorageResult<()> {
        self.clients.write().entry(*client).or_default().snapshot = Some(bytes.to_vec());
        Ok(())
    }

    fn read_snapshot(&self, client: &Uuid) -> StorageResult<Option<Vec<u8>>> {
        Ok(self
            .clients
            .read()
            .get(client)
            .and_then(|c| c.snapshot.clone()))
    }
}
