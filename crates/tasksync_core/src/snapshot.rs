//! Snapshot validation and the snapshot request policy.
//!
//! Only the newest snapshot per client is kept. The server never builds
//! snapshots itself; it tells clients, through the urgency attached to each
//! accepted version, when uploading one would shorten replay for new devices.

use crate::error::{CoreError, CoreResult};
use crate::types::VersionId;
use std::fmt;

/// How strongly the server wants a snapshot from the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SnapshotUrgency {
    /// No snapshot needed.
    None,
    /// A snapshot would be useful.
    Low,
    /// History since the last snapshot is long; upload one soon.
    High,
}

impl SnapshotUrgency {
    /// Returns the protocol token, or `None` when no snapshot is wanted.
    #[must_use]
    pub fn as_token(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Low => Some("low"),
            Self::High => Some("high"),
        }
    }
}

impl fmt::Display for SnapshotUrgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token().unwrap_or("none"))
    }
}

/// Thresholds, in versions since the latest snapshot, for requesting one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotPolicy {
    /// Versions after which urgency is `low`.
    pub versions_low: u64,
    /// Versions after which urgency is `high`.
    pub versions_high: u64,
}

impl SnapshotPolicy {
    /// Creates a policy. `versions_high` is raised to at least `versions_low`.
    #[must_use]
    pub fn new(versions_low: u64, versions_high: u64) -> Self {
        Self {
            versions_low,
            versions_high: versions_high.max(versions_low),
        }
    }

    /// Computes the urgency after `latest` was committed, given the version
    /// of the newest stored snapshot.
    #[must_use]
    pub fn urgency(&self, latest: VersionId, snapshot: Option<VersionId>) -> SnapshotUrgency {
        let base = snapshot.unwrap_or(VersionId::NIL);
        let behind = latest.as_u64().saturating_sub(base.as_u64());
        if behind >= self.versions_high {
            SnapshotUrgency::High
        } else if behind >= self.versions_low {
            SnapshotUrgency::Low
        } else {
            SnapshotUrgency::None
        }
    }
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        Self::new(100, 200)
    }
}

/// Checks that a snapshot can be stored at `version` for a client whose
/// latest version is `latest`.
pub(crate) fn validate_version(version: VersionId, latest: VersionId) -> CoreResult<()> {
    if version.is_nil() {
        return Err(CoreError::invalid_version(
            "snapshot cannot be taken at the nil version",
        ));
    }
    if version > latest {
        return Err(CoreError::invalid_version(format!(
            "snapshot version {version} is beyond latest version {latest}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_thresholds() {
        let policy = SnapshotPolicy::new(3, 6);
        let v = VersionId::new;

        assert_eq!(policy.urgency(v(2), None), SnapshotUrgency::None);
        assert_eq!(policy.urgency(v(3), None), SnapshotUrgency::Low);
        assert_eq!(policy.urgency(v(6), None), SnapshotUrgency::High);
        assert_eq!(policy.urgency(v(6), Some(v(4))), SnapshotUrgency::None);
        assert_eq!(policy.urgency(v(9), Some(v(4))), SnapshotUrgency::Low);
    }

    #[test]
    fn high_never_below_low() {
        let policy = SnapshotPolicy::new(10, 2);
        assert_eq!(policy.versions_high, 10);
        assert_eq!(policy.urgency(VersionId::new(10), None), SnapshotUrgency::High);
    }

    #[test]
    fn tokens() {
        assert_eq!(SnapshotUrgency::None.as_token(), None);
        assert_eq!(SnapshotUrgency::High.to_string(), "high");
    }

    #[test]
    fn version_validation() {
        let latest = VersionId::new(5);
        assert!(validate_version(VersionId::new(5), latest).is_ok());
        assert!(validate_version(VersionId::new(1), latest).is_ok());
        assert!(validate_version(VersionId::NIL, latest).is_err());
        assert!(validate_version(VersionId::new(6), latest).is_err());
    }
}
