//! Core type definitions.

use crate::error::{CoreError, CoreResult};
use bytes::Bytes;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Opaque identifier of a syncing device.
///
/// Any non-nil UUID is a valid client id. A client exists from its first
/// accepted version onward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Wraps a UUID, rejecting the nil UUID.
    pub fn new(id: Uuid) -> CoreResult<Self> {
        if id.is_nil() {
            return Err(CoreError::InvalidClientId {
                input: id.to_string(),
                reason: "nil uuid".into(),
            });
        }
        Ok(Self(id))
    }

    /// Generates a random client id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a client id from its textual UUID form.
    pub fn parse(input: &str) -> CoreResult<Self> {
        let id = Uuid::parse_str(input.trim()).map_err(|e| CoreError::InvalidClientId {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
        Self::new(id)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for ClientId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Position in one client's history.
///
/// `0` is the nil version (no history). Committed versions start at 1 and
/// are gapless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VersionId(u64);

impl VersionId {
    /// The version a client has before its first sync.
    pub const NIL: Self = Self(0);

    /// Creates a version id.
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns true for the nil version.
    #[must_use]
    pub const fn is_nil(self) -> bool {
        self.0 == 0
    }

    /// Returns the following version.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the following version, or `None` past `u64::MAX`.
    #[must_use]
    pub const fn checked_next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VersionId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|e| CoreError::invalid_version(format!("{s:?}: {e}")))
    }
}

/// One committed history segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Version assigned on commit.
    pub version: VersionId,
    /// Version the client based this segment on; always `version - 1`.
    pub parent: VersionId,
    /// Commit time in Unix milliseconds.
    pub committed_at_ms: u64,
    /// Opaque segment bytes.
    pub payload: Bytes,
}

/// A client's compacted state at some version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Version the snapshot represents.
    pub version: VersionId,
    /// Store time in Unix milliseconds.
    pub stored_at_ms: u64,
    /// Opaque snapshot bytes.
    pub payload: Bytes,
}

/// Current wall-clock time in Unix milliseconds.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
