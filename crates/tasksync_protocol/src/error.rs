//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while reading or writing protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A required header is absent.
    #[error("missing header {name}")]
    MissingHeader {
        /// Header name.
        name: &'static str,
    },

    /// The client id is not a usable UUID.
    #[error("invalid client id '{value}': {reason}")]
    InvalidClientId {
        /// Value as received.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A version in the path or a header is not a number.
    #[error("invalid version '{value}'")]
    InvalidVersion {
        /// Value as received.
        value: String,
    },

    /// The page limit is zero or not a number.
    #[error("invalid limit '{value}': must be a positive integer")]
    InvalidLimit {
        /// Value as received.
        value: String,
    },

    /// A header carries a value this protocol does not know.
    #[error("invalid value for header {name}: '{value}'")]
    InvalidHeader {
        /// Header name.
        name: &'static str,
        /// Value as received.
        value: String,
    },

    /// A CBOR body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// A CBOR body could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),
}

impl ProtocolError {
    /// Returns true if the peer sent something malformed.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ProtocolError::Encode(_))
    }
}
