//! Protocol messages.

use crate::error::{ProtocolError, ProtocolResult};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tasksync_core::{Batch, ClientId, SnapshotUrgency, VersionId};

/// AddVersion: commit a history segment on top of `parent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddVersionRequest {
    /// Submitting client.
    pub client: ClientId,
    /// Version the segment was built on.
    pub parent: VersionId,
    /// Opaque history segment.
    pub payload: Bytes,
}

/// Outcome of AddVersion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddVersionResponse {
    /// The segment is committed.
    Accepted {
        /// Version assigned to it.
        version: VersionId,
        /// Whether the client should upload a snapshot.
        snapshot_urgency: SnapshotUrgency,
    },
    /// `parent` was not the latest version. The client must pull and retry.
    Conflict {
        /// The client's latest version.
        latest: VersionId,
    },
}

/// GetChildVersions: every segment after `since`, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetChildVersionsRequest {
    /// Requesting client.
    pub client: ClientId,
    /// Exclusive lower bound.
    pub since: VersionId,
    /// Requested page size.
    pub limit: Option<usize>,
}

/// Lookup of the single segment whose parent is `parent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetChildVersionRequest {
    /// Requesting client.
    pub client: ClientId,
    /// Parent version.
    pub parent: VersionId,
}

/// AddSnapshot: store the client's full state at `version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddSnapshotRequest {
    /// Submitting client.
    pub client: ClientId,
    /// Version the snapshot represents.
    pub version: VersionId,
    /// Opaque snapshot.
    pub payload: Bytes,
}

/// Outcome of AddSnapshot. Both outcomes are acknowledged with success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddSnapshotResponse {
    /// The snapshot is the client's latest.
    Stored,
    /// An equal or newer snapshot was kept instead.
    Superseded {
        /// Version of the kept snapshot.
        current: VersionId,
    },
}

/// GetSnapshot: the client's newest snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetSnapshotRequest {
    /// Requesting client.
    pub client: ClientId,
}

/// One segment in a [`ChildVersions`] listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// Version of the segment.
    pub version: u64,
    /// Version it was built on.
    pub parent: u64,
    /// Commit time, milliseconds since the Unix epoch.
    pub committed_at_ms: u64,
    /// Opaque history segment.
    pub payload: Bytes,
}

impl From<Batch> for VersionEntry {
    fn from(batch: Batch) -> Self {
        Self {
            version: batch.version.as_u64(),
            parent: batch.parent.as_u64(),
            committed_at_ms: batch.committed_at_ms,
            payload: batch.payload,
        }
    }
}

/// Body of a GetChildVersions response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildVersions {
    /// Segments in ascending version order.
    pub versions: Vec<VersionEntry>,
    /// The client's latest version when the page was read.
    pub latest: u64,
    /// True if segments after the last one in this page exist.
    pub has_more: bool,
}

impl ChildVersions {
    /// Builds a page from up to `limit + 1` batches read from the store.
    ///
    /// The extra batch, if present, only sets `has_more`.
    pub fn page(mut batches: Vec<Batch>, limit: usize, latest: VersionId) -> Self {
        let has_more = batches.len() > limit;
        batches.truncate(limit);
        Self {
            versions: batches.into_iter().map(VersionEntry::from).collect(),
            latest: latest.as_u64(),
            has_more,
        }
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| ProtocolError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        ciborium::from_reader(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}
