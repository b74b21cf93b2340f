//! Routes, headers and content types.

use tasksync_core::VersionId;

/// Prefix shared by every client route.
pub const CLIENT_PREFIX: &str = "/v1/client";

/// AddVersion route segment.
pub const ADD_VERSION: &str = "add-version";
/// GetChildVersions route segment.
pub const GET_CHILD_VERSIONS: &str = "get-child-versions";
/// Single-child lookup route segment.
pub const GET_CHILD_VERSION: &str = "get-child-version";
/// AddSnapshot route segment.
pub const ADD_SNAPSHOT: &str = "add-snapshot";
/// GetSnapshot route segment.
pub const SNAPSHOT: &str = "snapshot";

/// Header naming the client a request belongs to.
pub const HEADER_CLIENT_ID: &str = "x-client-id";
/// Header carrying the version a response describes.
pub const HEADER_VERSION_ID: &str = "x-version-id";
/// Header carrying a parent version. On a conflict it holds the latest version.
pub const HEADER_PARENT_VERSION_ID: &str = "x-parent-version-id";
/// Header asking the client to upload a snapshot.
pub const HEADER_SNAPSHOT_REQUEST: &str = "x-snapshot-request";

/// Content type of a history segment body.
pub const CONTENT_TYPE_HISTORY_SEGMENT: &str = "application/vnd.taskchampion.history-segment";
/// Content type of a snapshot body.
pub const CONTENT_TYPE_SNAPSHOT: &str = "application/vnd.taskchampion.snapshot";
/// Content type of a [`ChildVersions`](crate::ChildVersions) body.
pub const CONTENT_TYPE_CBOR: &str = "application/cbor";

/// Path of AddVersion for `parent`.
pub fn add_version_path(parent: VersionId) -> String {
    format!("{CLIENT_PREFIX}/{ADD_VERSION}/{parent}")
}

/// Path of GetChildVersions after `since`.
pub fn get_child_versions_path(since: VersionId) -> String {
    format!("{CLIENT_PREFIX}/{GET_CHILD_VERSIONS}/{since}")
}

/// Path of the single-child lookup for `parent`.
pub fn get_child_version_path(parent: VersionId) -> String {
    format!("{CLIENT_PREFIX}/{GET_CHILD_VERSION}/{parent}")
}

/// Path of AddSnapshot at `version`.
pub fn add_snapshot_path(version: VersionId) -> String {
    format!("{CLIENT_PREFIX}/{ADD_SNAPSHOT}/{version}")
}

/// Path of GetSnapshot.
pub fn snapshot_path() -> String {
    format!("{CLIENT_PREFIX}/{SNAPSHOT}")
}
