//! # tasksync server
//!
//! HTTP sync server for local-first task databases.
//!
//! This crate provides:
//! - The request handler mapping protocol requests onto a [`SyncStore`]
//! - The axum router for the sync routes
//! - The server lifecycle (`Starting -> Serving -> ShuttingDown -> Stopped`)
//!
//! The server never looks inside history segments or snapshots. Its only job
//! is to keep each client's history linear: a new version is accepted only
//! if it was built on the latest one.
//!
//! [`SyncStore`]: tasksync_core::SyncStore

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod routes;
mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use routes::router;
pub use server::{shutdown_signal, ServerHandle, ServerState, SyncServer};
