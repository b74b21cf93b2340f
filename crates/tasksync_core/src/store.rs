//! The sync store: every client's log and snapshot behind per-client locks.

use crate::config::StoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::log::ClientLog;
use crate::record::Record;
use crate::snapshot::{self, SnapshotUrgency};
use crate::tracker::Conflict;
use crate::types::{now_millis, Batch, ClientId, Snapshot, VersionId};
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tasksync_storage::{ClientStorage, DataDir, DiskStorage, MemoryStorage};

/// Result of an accepted append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Version assigned to the new segment.
    pub version: VersionId,
    /// Whether the client should upload a snapshot.
    pub snapshot_urgency: SnapshotUrgency,
}

/// Result of a snapshot upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// The snapshot is now the client's latest.
    Stored,
    /// An equal or newer snapshot already exists; nothing was written.
    Superseded {
        /// Version of the snapshot that was kept.
        current: VersionId,
    },
}

struct ClientEntry {
    log: RwLock<ClientLog>,
    /// Version of the newest stored snapshot. The lock also serializes
    /// snapshot writes, and is never taken while `log` is held.
    snapshot: Mutex<Option<VersionId>>,
}

/// Thread-safe store of all clients.
///
/// Appends to one client take that client's write lock for the duration of
/// check-and-append; reads take its read lock. Different clients never wait
/// on each other except while a client is opened for the first time.
pub struct SyncStore {
    storage: Box<dyn ClientStorage>,
    config: StoreConfig,
    clients: RwLock<HashMap<ClientId, Arc<ClientEntry>>>,
}

impl SyncStore {
    /// Creates a store over any client storage.
    pub fn new(storage: Box<dyn ClientStorage>, config: StoreConfig) -> Self {
        Self {
            storage,
            config,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a store that keeps everything in memory.
    pub fn in_memory(config: StoreConfig) -> Self {
        Self::new(Box::new(MemoryStorage::new()), config)
    }

    /// Opens (creating if needed) and locks a data directory.
    pub fn open_dir(path: &Path, config: StoreConfig) -> CoreResult<Self> {
        let dir = DataDir::open(path)?;
        let store = Self::new(Box::new(DiskStorage::new(dir)), config);
        tracing::info!(
            data_dir = %path.display(),
            clients = store.storage.list_clients()?.len(),
            "opened data directory"
        );
        Ok(store)
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Commits `payload` as the child of `parent` for `client`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Conflict`] if `parent` is not the latest version;
    ///   nothing is written
    /// - [`CoreError::PayloadTooLarge`] if the payload exceeds the limit
    /// - storage errors, after which the latest version is unchanged
    pub fn append_batch(
        &self,
        client: ClientId,
        parent: VersionId,
        payload: Bytes,
    ) -> CoreResult<AppendOutcome> {
        self.check_size(payload.len())?;

        let entry = match self.entry(client, false)? {
            Some(entry) => entry,
            // Unknown clients only come into existence with their first version.
            None if !parent.is_nil() => {
                return Err(CoreError::Conflict(Conflict {
                    latest: VersionId::NIL,
                    parent,
                }))
            }
            None => self.entry(client, true)?.ok_or_else(|| {
                CoreError::corruption(format!("client {client} vanished while opening"))
            })?,
        };

        let size = payload.len();
        let version = entry
            .log
            .write()
            .append(parent, payload)
            .inspect_err(|e| report("append_batch", client, parent, e))?;

        let snapshot_urgency = self
            .config
            .snapshot_policy
            .urgency(version, *entry.snapshot.lock());
        tracing::debug!(%client, %version, bytes = size, urgency = %snapshot_urgency, "accepted version");

        Ok(AppendOutcome {
            version,
            snapshot_urgency,
        })
    }

    /// Reads every batch after `since`, ascending, at most `limit`.
    ///
    /// Unknown clients and versions at or beyond the latest give an empty list.
    pub fn read_batches(
        &self,
        client: ClientId,
        since: VersionId,
        limit: Option<usize>,
    ) -> CoreResult<Vec<Batch>> {
        let Some(entry) = self.entry(client, false)? else {
            return Ok(Vec::new());
        };
        let batches = entry
            .log
            .read()
            .read_since(since, limit)
            .inspect_err(|e| report("read_batches", client, since, e))?;
        Ok(batches)
    }

    /// Reads the single batch whose parent is `parent`.
    pub fn read_child(&self, client: ClientId, parent: VersionId) -> CoreResult<Option<Batch>> {
        let Some(entry) = self.entry(client, false)? else {
            return Ok(None);
        };
        let child = entry
            .log
            .read()
            .child_of(parent)
            .inspect_err(|e| report("read_child", client, parent, e))?;
        Ok(child)
    }

    /// Returns the client's latest version, nil for unknown clients.
    pub fn latest_version(&self, client: ClientId) -> CoreResult<VersionId> {
        Ok(self
            .entry(client, false)?
            .map_or(VersionId::NIL, |entry| entry.log.read().latest()))
    }

    /// Stores a snapshot of the client's state at `version`.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidVersion`] if `version` is nil or later than the
    /// client's latest version.
    pub fn store_snapshot(
        &self,
        client: ClientId,
        version: VersionId,
        payload: Bytes,
    ) -> CoreResult<SnapshotOutcome> {
        self.check_size(payload.len())?;

        let Some(entry) = self.entry(client, false)? else {
            return Err(CoreError::invalid_version(format!(
                "snapshot version {version} but client {client} has no versions"
            )));
        };

        let mut current = entry.snapshot.lock();
        let latest = entry.log.read().latest();
        snapshot::validate_version(version, latest)?;

        if let Some(kept) = *current {
            if version <= kept {
                tracing::debug!(%client, %version, current = %kept, "ignoring older snapshot");
                return Ok(SnapshotOutcome::Superseded { current: kept });
            }
        }

        let bytes = Record::Snapshot(Snapshot {
            version,
            stored_at_ms: now_millis(),
            payload,
        })
        .encode()?;
        self.storage
            .write_snapshot(client.as_uuid(), &bytes)
            .map_err(CoreError::from)
            .inspect_err(|e| report("store_snapshot", client, version, e))?;

        *current = Some(version);
        tracing::info!(%client, %version, latest = %latest, "stored snapshot");
        Ok(SnapshotOutcome::Stored)
    }

    /// Reads the client's newest snapshot.
    pub fn read_latest_snapshot(&self, client: ClientId) -> CoreResult<Option<Snapshot>> {
        let Some(entry) = self.entry(client, false)? else {
            return Ok(None);
        };
        let _guard = entry.snapshot.lock();
        self.load_snapshot(client)
            .inspect_err(|e| report("read_latest_snapshot", client, VersionId::NIL, e))
    }

    /// Lists every client with stored data.
    pub fn clients(&self) -> CoreResult<Vec<ClientId>> {
        Ok(self
            .storage
            .list_clients()?
            .into_iter()
            .filter_map(|id| ClientId::new(id).ok())
            .collect())
    }

    /// Syncs every open log. Called once the server stops taking requests.
    ///
    /// Every log is attempted; the first error is returned.
    pub fn close(&self) -> CoreResult<()> {
        let entries: Vec<_> = self.clients.read().values().cloned().collect();
        let mut first_error = None;
        for entry in &entries {
            let mut log = entry.log.write();
            if let Err(e) = log.sync() {
                tracing::error!(client = %log.client(), error = %e, "failed to sync version log on close");
                first_error.get_or_insert(e);
            }
        }
        tracing::info!(clients = entries.len(), "closed sync store");
        first_error.map_or(Ok(()), Err)
    }

    fn check_size(&self, size: usize) -> CoreResult<()> {
        if size > self.config.max_payload_bytes {
            return Err(CoreError::PayloadTooLarge {
                size,
                max: self.config.max_payload_bytes,
            });
        }
        Ok(())
    }

    fn entry(&self, client: ClientId, create: bool) -> CoreResult<Option<Arc<ClientEntry>>> {
        if let Some(entry) = self.clients.read().get(&client) {
            return Ok(Some(Arc::clone(entry)));
        }
        if !create && !self.storage.client_exists(client.as_uuid()) {
            return Ok(None);
        }

        let mut clients = self.clients.write();
        if let Some(entry) = clients.get(&client) {
            return Ok(Some(Arc::clone(entry)));
        }

        let backend = self.storage.open_log(client.as_uuid())?;
        let log = ClientLog::open(client, backend, self.config.sync_on_write)?;
        let snapshot = self.load_snapshot(client)?.map(|s| s.version);

        let entry = Arc::new(ClientEntry {
            log: RwLock::new(log),
            snapshot: Mutex::new(snapshot),
        });
        clients.insert(client, Arc::clone(&entry));
        Ok(Some(entry))
    }

    fn load_snapshot(&self, client: ClientId) -> CoreResult<Option<Snapshot>> {
        let Some(bytes) = self.storage.read_snapshot(client.as_uuid())? else {
            return Ok(None);
        };
        match Record::decode(&bytes)? {
            Record::Snapshot(snapshot) => Ok(Some(snapshot)),
            Record::Version(_) => Err(CoreError::corruption(format!(
                "snapshot file of {client} holds a version record"
            ))),
        }
    }
}

/// Logs a failed operation. Payload bytes are never logged.
fn report(op: &'static str, client: ClientId, version: VersionId, err: &CoreError) {
    if err.is_internal() {
        tracing::error!(%client, op, %version, error = %err, "storage failure");
    } else {
        tracing::debug!(%client, op, %version, error = %err, "request rejected");
    }
}
