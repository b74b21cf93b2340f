//! # tasksync protocol
//!
//! The sync protocol spoken between task clients and the tasksync server.
//!
//! The protocol has four operations:
//!
//! | Operation | Route |
//! |-----------|-------|
//! | AddVersion | `POST /v1/client/add-version/{parent}` |
//! | GetChildVersions | `GET /v1/client/get-child-versions/{since}` |
//! | AddSnapshot | `POST /v1/client/add-snapshot/{version}` |
//! | GetSnapshot | `GET /v1/client/snapshot` |
//!
//! plus `GET /v1/client/get-child-version/{parent}` for clients that pull one
//! segment at a time. Every request names its client in the `X-Client-Id`
//! header. History segments and snapshots travel as raw bodies; only the
//! child-versions listing has a structured (CBOR) body.
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod messages;
mod parse;
mod wire;

pub use error::{ProtocolError, ProtocolResult};
pub use messages::{
    AddSnapshotRequest, AddSnapshotResponse, AddVersionRequest, AddVersionResponse,
    ChildVersions, GetChildVersionRequest, GetChildVersionsRequest, GetSnapshotRequest,
    VersionEntry,
};
pub use parse::{
    format_snapshot_request, parse_client_id, parse_limit, parse_snapshot_request, parse_version,
    PageLimits,
};
pub use wire::*;
