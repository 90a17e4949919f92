//! Error types for the Inkspace SDK.

use inkspace_ot::{ClientId, OtError};
use thiserror::Error;

/// Error type for SDK operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SdkError {
    /// An operation failed to apply, transform or decode.
    #[error(transparent)]
    Ot(#[from] OtError),

    #[error("Session has not joined a room")]
    NotJoined,

    #[error("Acknowledgment received with no operation in flight")]
    UnexpectedAck,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Client not found: {0}")]
    ClientNotFound(ClientId),

    #[error("Revision {revision} is ahead of the room history ({history})")]
    RevisionAhead { revision: u64, history: u64 },
}

impl SdkError {
    /// Whether the replica has diverged from the authority.
    ///
    /// A session that hits one of these must be discarded and rejoined.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, SdkError::Ot(_) | SdkError::UnexpectedAck)
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(err: serde_json::Error) -> Self {
        SdkError::SerializationError(err.to_string())
    }
}

/// Result type for SDK operations.
pub type Result<T> = std::result::Result<T, SdkError>;
