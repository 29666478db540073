//! Telemetry frame body layout.
//!
//! ```text
//! [0:36)      device identity
//! [36:292)    RSA PKCS#1 v1.5 signature over SHA-256(ciphertext)
//! [292:304)   AES-GCM nonce
//! [304:)      ciphertext (tag appended)
//! ```
//!
//! Identity, signature, and nonce travel in the clear. Only the payload is
//! encrypted.

use bytes::Bytes;

use crate::{DeviceIdentity, Frame, FrameType, ProtocolError, Result};

/// Signature length for a 2048-bit RSA key.
pub const SIGNATURE_SIZE: usize = 256;

/// AES-GCM nonce length.
pub const NONCE_SIZE: usize = 12;

const SIGNATURE_OFFSET: usize = DeviceIdentity::LEN;
const NONCE_OFFSET: usize = SIGNATURE_OFFSET + SIGNATURE_SIZE;
const CIPHERTEXT_OFFSET: usize = NONCE_OFFSET + NONCE_SIZE;

/// Parsed telemetry body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeBody {
    /// Sending device
    pub identity: DeviceIdentity,
    /// Signature over the SHA-256 of `ciphertext`
    pub signature: Bytes,
    /// Nonce the ciphertext was sealed with
    pub nonce: [u8; NONCE_SIZE],
    /// Encrypted payload including the GCM tag
    pub ciphertext: Bytes,
}

impl EnvelopeBody {
    /// Fixed-size prefix preceding the ciphertext.
    pub const FIXED_LEN: usize = CIPHERTEXT_OFFSET;

    /// Smallest acceptable telemetry body: the fixed fields plus one
    /// ciphertext byte.
    pub const MIN_LEN: usize = Self::FIXED_LEN + 1;

    /// Split a telemetry body into its fields.
    ///
    /// The length is checked before any slicing, so short bodies can never
    /// cause an out-of-range read. Slices share the underlying buffer.
    pub fn parse(body: &Bytes) -> Result<Self> {
        if body.len() < Self::MIN_LEN {
            return Err(ProtocolError::BodyTooShort {
                frame_type: FrameType::Telemetry,
                size: body.len(),
                min: Self::MIN_LEN,
            });
        }

        let identity = DeviceIdentity::from_bytes(&body[..SIGNATURE_OFFSET])?;
        let signature = body.slice(SIGNATURE_OFFSET..NONCE_OFFSET);
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&body[NONCE_OFFSET..CIPHERTEXT_OFFSET]);
        let ciphertext = body.slice(CIPHERTEXT_OFFSET..);

        Ok(Self { identity, signature, nonce, ciphertext })
    }

    /// Concatenate identity ‖ signature ‖ nonce ‖ ciphertext.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::FIXED_LEN + self.ciphertext.len());
        out.extend_from_slice(self.identity.as_bytes());
        out.extend_from_slice(&self.signature);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Wrap this body in a telemetry frame.
    ///
    /// Fails with [`ProtocolError::BodyTooLarge`] if the assembled body does
    /// not fit the 16-bit length field.
    pub fn into_frame(self) -> Result<Frame> {
        if self.signature.len() != SIGNATURE_SIZE {
            return Err(ProtocolError::InvalidPayload(format!(
                "signature must be {SIGNATURE_SIZE} bytes, got {}",
                self.signature.len()
            )));
        }
        Frame::new(FrameType::Telemetry, self.to_bytes())
    }
}
