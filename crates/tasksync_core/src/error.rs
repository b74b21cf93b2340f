//! Error types for the core store.

use crate::tracker::Conflict;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core store operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] tasksync_storage::StorageError),

    /// The parent version did not match the client's latest version.
    #[error("{0}")]
    Conflict(Conflict),

    /// A client identifier could not be parsed or is not allowed.
    #[error("invalid client id {input:?}: {reason}")]
    InvalidClientId {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A version argument is out of range for the client.
    #[error("invalid version: {message}")]
    InvalidVersion {
        /// Description of the problem.
        message: String,
    },

    /// Payload exceeds the configured maximum.
    #[error("payload of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge {
        /// Submitted size.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// A version log or snapshot file is corrupted.
    #[error("log corruption: {message}")]
    Corruption {
        /// Description of the corruption.
        message: String,
    },

    /// Checksum mismatch on a stored record.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Stored checksum.
        expected: u32,
        /// Computed checksum.
        actual: u32,
    },
}

impl CoreError {
    /// Creates a corruption error.
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }

    /// Creates an invalid version error.
    pub fn invalid_version(message: impl Into<String>) -> Self {
        Self::InvalidVersion {
            message: message.into(),
        }
    }

    /// Returns true for a parent-version conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns true if the caller sent bad input.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidClientId { .. } | Self::InvalidVersion { .. } | Self::PayloadTooLarge { .. }
        )
    }

    /// Returns true if the failure is on the server side: I/O or corrupt data.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Corruption { .. } | Self::ChecksumMismatch { .. }
        )
    }
}
