//! Per-connection processing stages.

use std::fmt;

/// Stage a device connection is in.
///
/// A connection moves strictly forward through these stages. Any failure
/// goes straight to [`SessionState::Closed`] without a response.
///
/// ```text
/// AwaitFrame → Dispatch → Authenticate → Decrypt → Validate → Persist → Acknowledge → Closed
///      │           │            │           │          │          │
///      └───────────┴────────────┴───────────┴──────────┴──────────┴──> Closed (no response)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Reading one frame from the stream
    AwaitFrame,
    /// Routing by frame type
    Dispatch,
    /// Resolving the device key and verifying the signature
    Authenticate,
    /// AES-GCM decryption and payload decoding
    Decrypt,
    /// Field-shape and forge-resistance checks
    Validate,
    /// Handing the payload to the sink
    Persist,
    /// Writing the acknowledgment
    Acknowledge,
    /// Connection finished
    Closed,
}

impl SessionState {
    /// Short lowercase name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AwaitFrame => "await_frame",
            Self::Dispatch => "dispatch",
            Self::Authenticate => "authenticate",
            Self::Decrypt => "decrypt",
            Self::Validate => "validate",
            Self::Persist => "persist",
            Self::Acknowledge => "acknowledge",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
