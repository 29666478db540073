//! Wire format for the Fieldwire device telemetry protocol.
//!
//! A frame is a fixed 5-byte header (marker, type tag, little-endian body
//! length) followed by the body. The telemetry body is itself a fixed-offset
//! layout: device identity, RSA signature, AEAD nonce, then the ciphertext of
//! a JSON-encoded [`TelemetryPayload`].
//!
//! ```text
//! offset 0..1   marker        0xAA 0x55
//! offset 2      frame type    telemetry=0x01, key-exchange=0x02, test=0x03
//! offset 3..4   body length   u16 little-endian
//! offset 5..    body
//! ```
//!
//! # Security
//!
//! Header parsing uses compile-time verified layouts via `zerocopy`. The body
//! length is bounded by the 16-bit length field, so a peer can never make us
//! allocate more than 64 KiB per frame. Every slicing operation on the
//! telemetry body is preceded by a minimum-length check.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod envelope;
pub mod errors;
pub mod frame;
pub mod frame_type;
pub mod header;
pub mod identity;
pub mod payload;

pub use envelope::{EnvelopeBody, NONCE_SIZE, SIGNATURE_SIZE};
pub use errors::{ProtocolError, Result};
pub use frame::Frame;
pub use frame_type::FrameType;
pub use header::FrameHeader;
pub use identity::DeviceIdentity;
pub use payload::TelemetryPayload;

/// Acknowledgment written by the server after a frame was fully processed.
pub const ACK: &[u8] = b"ty\n";
