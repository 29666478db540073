//! Server error types.

use std::{io, time::Duration};

use fieldwire_core::{ResolveError, SessionState, StorageError};
use fieldwire_crypto::CryptoError;
use fieldwire_proto::ProtocolError;
use thiserror::Error;

use crate::store::StoreError;

/// Why a device connection was closed without an acknowledgment.
///
/// None of this is ever sent to the peer. Each variant belongs to exactly one
/// processing stage, reported by [`SessionError::stage`] for logging.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Security handshake on the accepted connection failed
    #[error("transport handshake failed: {0}")]
    Handshake(#[source] io::Error),

    /// No complete frame arrived before the read deadline
    #[error("no frame within {0:?}")]
    ReadTimeout(Duration),

    /// Stream did not carry a well-formed frame
    #[error("framing error: {0}")]
    Frame(#[source] ProtocolError),

    /// No handler is registered for this type tag
    #[error("no handler for frame type {0:#04x}")]
    Unrouted(u8),

    /// Body does not have the fixed layout of its frame type
    #[error("malformed body: {0}")]
    Body(#[source] ProtocolError),

    /// Device key could not be resolved
    #[error("key resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    /// Signature did not verify
    #[error("authentication failed: {0}")]
    Authentication(#[source] CryptoError),

    /// Ciphertext did not decrypt
    #[error("decryption failed: {0}")]
    Decryption(#[source] CryptoError),

    /// Plaintext is not a telemetry record
    #[error("undecodable payload: {0}")]
    Payload(#[source] ProtocolError),

    /// Payload fields violate their shape invariants
    #[error("validation failed: {0}")]
    Validation(String),

    /// Forge-resistance hash does not match the installation identifier
    #[error("forge-resistance hash mismatch, tampering or forgery detected")]
    ForgeHashMismatch,

    /// Sink rejected the payload
    #[error("persistence failed: {0}")]
    Storage(#[from] StorageError),

    /// Acknowledgment could not be written
    #[error("acknowledgment write failed: {0}")]
    Acknowledge(#[source] io::Error),
}

impl SessionError {
    /// Stage the connection was in when it failed.
    pub fn stage(&self) -> SessionState {
        match self {
            Self::Handshake(_) | Self::ReadTimeout(_) | Self::Frame(_) => SessionState::AwaitFrame,
            Self::Unrouted(_) | Self::Body(_) => SessionState::Dispatch,
            Self::Resolve(_) | Self::Authentication(_) => SessionState::Authenticate,
            Self::Decryption(_) | Self::Payload(_) => SessionState::Decrypt,
            Self::Validation(_) | Self::ForgeHashMismatch => SessionState::Validate,
            Self::Storage(_) => SessionState::Persist,
            Self::Acknowledge(_) => SessionState::Acknowledge,
        }
    }

    /// True for failures on our side rather than the peer's.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Resolve(ResolveError::Backend(_)))
    }
}

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// TLS certificate or key problem
    #[error("TLS setup failed: {0}")]
    Tls(String),

    /// Key registry / telemetry store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Key material problem
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Invalid device identity
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Socket failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
