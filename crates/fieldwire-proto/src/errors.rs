//! Protocol error types.

use thiserror::Error;

use crate::FrameType;

/// Result alias for wire-format operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding frames and their bodies.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The first two bytes of the stream were not the frame marker.
    #[error("invalid frame marker: expected {expected:02x?}, found {found:02x?}")]
    InvalidMarker {
        /// Marker the protocol requires
        expected: [u8; 2],
        /// Bytes actually received
        found: [u8; 2],
    },

    /// The type tag does not name a frame type this protocol version knows.
    #[error("unknown frame type: {0:#04x}")]
    UnknownFrameType(u8),

    /// Body exceeds what the 16-bit length field can describe.
    #[error("frame body too large: {size} bytes (max {max})")]
    BodyTooLarge {
        /// Actual body size
        size: usize,
        /// Largest encodable body
        max: usize,
    },

    /// Body is shorter than the fixed fields of its frame type.
    #[error("{frame_type:?} body too short: {size} bytes (min {min})")]
    BodyTooShort {
        /// Frame type whose minimum was violated
        frame_type: FrameType,
        /// Actual body size
        size: usize,
        /// Minimum body size for this frame type
        min: usize,
    },

    /// Buffer ended before a complete frame could be read.
    #[error("truncated frame: needed {needed} bytes, had {available}")]
    Truncated {
        /// Bytes required to make progress
        needed: usize,
        /// Bytes available in the buffer
        available: usize,
    },

    /// Device identity bytes are not a 36-byte textual identifier.
    #[error("invalid device identity: {0}")]
    InvalidIdentity(String),

    /// Decrypted payload does not have the expected business shape.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Payload could not be (de)serialized.
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport failure while reading or writing a frame.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
