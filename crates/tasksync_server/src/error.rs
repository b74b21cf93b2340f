//! Error types for the sync server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use tasksync_core::{ClientId, CoreError};
use tasksync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the sync server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Malformed request input.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The client is not on the allow-list.
    #[error("client {0} is not allowed to sync")]
    NotAllowed(ClientId),

    /// Error from the sync store.
    #[error(transparent)]
    Store(#[from] CoreError),

    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        match self {
            ServerError::Protocol(e) => e.is_client_error(),
            ServerError::NotAllowed(_) => true,
            ServerError::Store(e) => e.is_invalid_input() || e.is_conflict(),
            _ => false,
        }
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::NotAllowed(_) => StatusCode::FORBIDDEN,
            ServerError::Store(CoreError::PayloadTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Store(CoreError::Conflict(_)) => StatusCode::CONFLICT,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.is_server_error() {
            tracing::error!(error = %self, "request failed");
            return (status, "internal server error").into_response();
        }
        (status, self.to_string()).into_response()
    }
}
