//! Client error types.

use fieldwire_crypto::CryptoError;
use fieldwire_proto::ProtocolError;
use thiserror::Error;

/// Errors surfaced to the caller while composing or submitting a frame.
///
/// The protocol is not retry-aware; whether to try again is the caller's
/// decision.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// Business fields violate their shape invariants
    #[error("invalid telemetry: {0}")]
    Validation(#[source] ProtocolError),

    /// Forge hash derivation, encryption or signing failed
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Payload encoding or framing failed
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Assembled body does not fit the 16-bit length field
    #[error("frame body of {size} bytes exceeds the {max}-byte limit")]
    PayloadTooLarge {
        /// Assembled body size
        size: usize,
        /// Largest encodable body
        max: usize,
    },

    /// Reading local key material or talking to the server failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS configuration problem
    #[error("TLS error: {0}")]
    Tls(String),

    /// Server closed without acknowledging the frame
    #[error("frame not acknowledged (server sent {} bytes)", received.len())]
    NotAcknowledged {
        /// Whatever the server sent before closing
        received: Vec<u8>,
    },
}
