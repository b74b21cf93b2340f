//! # tasksync testkit
//!
//! Test utilities for the tasksync server.
//!
//! This crate provides:
//! - Store fixtures (in memory and on disk) with automatic cleanup
//! - Property-based test generators using proptest
//! - Concurrency stress helpers for the version tracker
//!
//! ## Usage
//!
//! ```rust
//! use tasksync_testkit::prelude::*;
//!
//! with_temp_store(|store| {
//!     let client = ClientId::generate();
//!     let payloads = seed_versions(store, client, 3);
//!     assert_eq!(payloads.len(), 3);
//!     assert_eq!(store.latest_version(client).unwrap(), VersionId::new(3));
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
    pub use tasksync_core::{ClientId, StoreConfig, SyncStore, VersionId};
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
