//! Parsing of request inputs and protocol header values.

use crate::error::{ProtocolError, ProtocolResult};
use crate::wire::HEADER_CLIENT_ID;
use tasksync_core::{ClientId, SnapshotUrgency, VersionId};

/// Parses the `X-Client-Id` header value.
pub fn parse_client_id(value: Option<&str>) -> ProtocolResult<ClientId> {
    let value = value.ok_or(ProtocolError::MissingHeader {
        name: HEADER_CLIENT_ID,
    })?;
    ClientId::parse(value).map_err(|e| ProtocolError::InvalidClientId {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Parses a version path segment or header value.
pub fn parse_version(value: &str) -> ProtocolResult<VersionId> {
    value
        .trim()
        .parse::<u64>()
        .map(VersionId::new)
        .map_err(|_| ProtocolError::InvalidVersion {
            value: value.to_string(),
        })
}

/// Parses the `limit` query parameter.
pub fn parse_limit(value: &str) -> ProtocolResult<usize> {
    match value.trim().parse::<usize>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(ProtocolError::InvalidLimit {
            value: value.to_string(),
        }),
    }
}

/// Formats the `X-Snapshot-Request` value for an urgency, if any.
pub fn format_snapshot_request(urgency: SnapshotUrgency) -> Option<String> {
    urgency.as_token().map(|token| format!("urgency={token}"))
}

/// Parses an `X-Snapshot-Request` value.
pub fn parse_snapshot_request(value: &str) -> ProtocolResult<SnapshotUrgency> {
    match value.trim() {
        "urgency=low" => Ok(SnapshotUrgency::Low),
        "urgency=high" => Ok(SnapshotUrgency::High),
        _ => Err(ProtocolError::InvalidHeader {
            name: crate::wire::HEADER_SNAPSHOT_REQUEST,
            value: value.to_string(),
        }),
    }
}

/// Page sizes for GetChildVersions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    /// Page size when the request names none.
    pub default: usize,
    /// Largest page ever returned.
    pub max: usize,
}

impl PageLimits {
    /// Resolves the page size for a request.
    pub fn resolve(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default).min(self.max).max(1)
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default: 100,
            max: 1000,
        }
    }
}
