//! # tasksync storage
//!
//! Byte-store backends and the on-disk layout of a tasksync data directory.
//!
//! Backends are **opaque byte stores**: they append, read and truncate bytes
//! and know nothing about version records or snapshots. Record framing and
//! version bookkeeping live in `tasksync_core`.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For tests and ephemeral servers
//! - [`FileBackend`] - For persistent storage using OS file APIs
//!
//! ## Client storage
//!
//! [`ClientStorage`] is the seam between the sync store and the place client
//! data lives. [`DiskStorage`] maps each client onto a directory under
//! `<data-dir>/clients/`; [`MemoryStorage`] keeps everything in process.
//!
//! ```rust
//! use tasksync_storage::{InMemoryBackend, LogBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"history segment").unwrap();
//! assert_eq!(backend.read_at(offset, 7).unwrap(), b"history");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod dir;
mod error;
mod file;
mod memory;
mod storage;

pub use backend::LogBackend;
pub use dir::{DataDir, CLIENTS_DIR, LOCK_FILE, LOG_FILE, SNAPSHOT_FILE};
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
pub use storage::{ClientStorage, DiskStorage, MemoryStorage};
