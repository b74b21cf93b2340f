//! # tasksync core
//!
//! The storage layer and version tracker of the tasksync server.
//!
//! Every client owns an append-only log of opaque history segments. Each
//! segment carries the version it was based on; the store only accepts a
//! segment whose parent is the client's latest version, and assigns it the
//! next one. Anything else is a [`Conflict`] that the client resolves by
//! pulling, rebasing and pushing again.
//!
//! ```rust
//! use bytes::Bytes;
//! use tasksync_core::{ClientId, StoreConfig, SyncStore, VersionId};
//!
//! let store = SyncStore::in_memory(StoreConfig::default());
//! let client = ClientId::generate();
//!
//! let v1 = store
//!     .append_batch(client, VersionId::NIL, Bytes::from_static(b"ops"))
//!     .unwrap()
//!     .version;
//! assert_eq!(v1, VersionId::new(1));
//!
//! // A second device still on the nil version is rejected.
//! let err = store
//!     .append_batch(client, VersionId::NIL, Bytes::from_static(b"other"))
//!     .unwrap_err();
//! assert!(err.is_conflict());
//! ```
//!
//! Payload bytes are never inspected.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod log;
mod record;
mod snapshot;
mod store;
mod tracker;
mod types;

pub use config::StoreConfig;
pub use error::{CoreError, CoreResult};
pub use log::ClientLog;
pub use record::{compute_crc32, Record, RecordKind, RECORD_FORMAT, RECORD_MAGIC};
pub use snapshot::{SnapshotPolicy, SnapshotUrgency};
pub use store::{AppendOutcome, SnapshotOutcome, SyncStore};
pub use tracker::{admit, Conflict, ConflictKind};
pub use types::{now_millis, Batch, ClientId, Snapshot, VersionId};
