//! Per-client append-only version log.

use crate::error::{CoreError, CoreResult};
use crate::record::{ReadOutcome, Record};
use crate::tracker;
use crate::types::{now_millis, Batch, ClientId, VersionId};
use bytes::Bytes;
use tasksync_storage::LogBackend;

/// Location of one version record in the backend.
#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    offset: u64,
    len: u64,
}

/// One client's history, as an append-only sequence of version records.
///
/// `index[i]` locates version `i + 1`, so the latest version is the index
/// length and versions are gapless by construction.
///
/// # Recovery
///
/// [`ClientLog::open`] scans every record:
/// - a trailing record cut short by a crash is dropped and the backend is
///   truncated to the last complete record
/// - a checksum mismatch, bad magic, unknown kind or a version that does not
///   continue the sequence fails the open
pub struct ClientLog {
    client: ClientId,
    backend: Box<dyn LogBackend>,
    index: Vec<IndexEntry>,
    sync_on_write: bool,
}

impl ClientLog {
    /// Opens a log over `backend`, recovering its index.
    pub fn open(
        client: ClientId,
        mut backend: Box<dyn LogBackend>,
        sync_on_write: bool,
    ) -> CoreResult<Self> {
        let mut index = Vec::new();
        let mut offset = 0u64;

        loop {
            match Record::read_from(backend.as_ref(), offset)? {
                ReadOutcome::End => break,
                ReadOutcome::Torn => {
                    let size = backend.size()?;
                    tracing::warn!(
                        %client,
                        offset,
                        discarded = size - offset,
                        "discarding torn record at end of version log"
                    );
                    backend.truncate(offset)?;
                    break;
                }
                ReadOutcome::Record { record, len } => {
                    let Record::Version(batch) = record else {
                        return Err(CoreError::corruption(format!(
                            "snapshot record in version log of {client} at offset {offset}"
                        )));
                    };
                    let expected = VersionId::new(index.len() as u64 + 1);
                    if batch.version != expected
                        || batch.parent.checked_next() != Some(expected)
                    {
                        return Err(CoreError::corruption(format!(
                            "version log of {client} jumps to {} (parent {}) where {expected} was expected",
                            batch.version, batch.parent
                        )));
                    }
                    index.push(IndexEntry { offset, len });
                    offset += len;
                }
            }
        }

        tracing::debug!(%client, versions = index.len(), "opened version log");
        Ok(Self {
            client,
            backend,
            index,
            sync_on_write,
        })
    }

    /// Returns the client this log belongs to.
    #[must_use]
    pub fn client(&self) -> ClientId {
        self.client
    }

    /// Returns the latest committed version, nil if there is none.
    #[must_use]
    pub fn latest(&self) -> VersionId {
        VersionId::new(self.index.len() as u64)
    }

    /// Returns the number of committed versions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if nothing has been committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Commits `payload` as the child of `parent`.
    ///
    /// On conflict nothing is written. On a storage failure the partial
    /// record is truncated away and the latest version is unchanged.
    pub fn append(&mut self, parent: VersionId, payload: Bytes) -> CoreResult<VersionId> {
        let version = tracker::admit(self.latest(), parent).map_err(CoreError::Conflict)?;

        let bytes = Record::Version(Batch {
            version,
            parent,
            committed_at_ms: now_millis(),
            payload,
        })
        .encode()?;

        let start = self.backend.size()?;
        if let Err(e) = self.write_record(&bytes) {
            if let Err(rollback) = self.backend.truncate(start) {
                tracing::error!(
                    client = %self.client,
                    %version,
                    error = %rollback,
                    "failed to roll back partial version record"
                );
            }
            return Err(e);
        }

        self.index.push(IndexEntry {
            offset: start,
            len: bytes.len() as u64,
        });
        Ok(version)
    }

    fn write_record(&mut self, bytes: &[u8]) -> CoreResult<()> {
        self.backend.append(bytes)?;
        if self.sync_on_write {
            self.backend.sync()?;
        }
        Ok(())
    }

    /// Reads one committed version.
    pub fn get(&self, version: VersionId) -> CoreResult<Option<Batch>> {
        if version.is_nil() || version > self.latest() {
            return Ok(None);
        }
        self.read_entry(self.index[version.as_u64() as usize - 1])
            .map(Some)
    }

    /// Reads the version whose parent is `parent`.
    pub fn child_of(&self, parent: VersionId) -> CoreResult<Option<Batch>> {
        match parent.checked_next() {
            Some(child) => self.get(child),
            None => Ok(None),
        }
    }

    /// Reads versions after `since` in ascending order, at most `limit`.
    pub fn read_since(&self, since: VersionId, limit: Option<usize>) -> CoreResult<Vec<Batch>> {
        let start = usize::try_from(since.as_u64()).unwrap_or(usize::MAX);
        let Some(entries) = self.index.get(start..) else {
            return Ok(Vec::new());
        };
        entries
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|entry| self.read_entry(*entry))
            .collect()
    }

    fn read_entry(&self, entry: IndexEntry) -> CoreResult<Batch> {
        let bytes = self.backend.read_at(entry.offset, entry.len as usize)?;
        match Record::decode(&bytes)? {
            Record::Version(batch) => Ok(batch),
            Record::Snapshot(_) => Err(CoreError::corruption(format!(
                "indexed entry at offset {} of {} is not a version",
                entry.offset, self.client
            ))),
        }
    }

    /// Flushes the log to durable storage.
    pub fn sync(&mut self) -> CoreResult<()> {
        self.backend.sync()?;
        Ok(())
    }
}
