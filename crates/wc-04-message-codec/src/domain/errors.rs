use thiserror::Error;

use super::{Family, MessageType};

/// Per-message decode failures.
///
/// None of these is fatal for the connection on its own; the connection
/// decides when repeated failures become a fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Empty frame")]
    EmptyFrame,

    #[error("Unrecognized message type 0x{0:02x}")]
    UnrecognizedType(u8),

    #[error("Tag 0x{tag:02x} is not assigned in the {family} family")]
    UnknownInFamily { family: Family, tag: u8 },

    /// Payload bytes are not a valid protobuf encoding of the claimed type.
    #[error("Malformed {kind} payload: {reason}")]
    Malformed { kind: MessageType, reason: String },

    /// Payload decoded but its content contradicts the message type.
    #[error("Invalid {kind} content: {reason}")]
    InvalidContent { kind: MessageType, reason: String },
}
