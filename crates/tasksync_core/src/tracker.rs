//! Optimistic concurrency on per-client versions.
//!
//! Each client has exactly one authoritative counter: the latest committed
//! version in its log. A submission names the version it was built on. The
//! store calls [`admit`] while holding the client's write lock, and appends
//! only if it returns `Ok`, so check and increment are one step.

use crate::types::VersionId;
use std::fmt;

/// How a rejected parent version relates to the latest one.
///
/// Both kinds are rejected identically; the distinction is diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// The client is behind: another device pushed since it last pulled.
    Stale,
    /// The client claims a version the server never issued.
    Ahead,
}

/// A rejected submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict {
    /// The client's latest committed version.
    pub latest: VersionId,
    /// The parent version that was submitted.
    pub parent: VersionId,
}

impl Conflict {
    /// Classifies the conflict.
    #[must_use]
    pub fn kind(&self) -> ConflictKind {
        if self.parent < self.latest {
            ConflictKind::Stale
        } else {
            ConflictKind::Ahead
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "version conflict: latest is {}, submitted parent {}",
            self.latest, self.parent
        )
    }
}

/// Admits a submission based on `parent` when the latest version is `latest`.
///
/// Returns the version the submission will be committed as.
pub fn admit(latest: VersionId, parent: VersionId) -> Result<VersionId, Conflict> {
    if parent == latest {
        Ok(latest.next())
    } else {
        Err(Conflict { latest, parent })
    }
}
