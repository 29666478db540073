//! Pre-shared symmetric key.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::CryptoError;

/// AES-256 key shared by every device and the server.
///
/// Provides confidentiality only; it is known to every device, so it says
/// nothing about who sent a frame. Loaded once at startup and shared
/// read-only. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; SharedSecret::LEN]);

impl SharedSecret {
    /// Key length in bytes.
    pub const LEN: usize = 32;

    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a key from a byte slice, rejecting anything but 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; Self::LEN] = bytes.try_into().map_err(|_| {
            CryptoError::KeyFormat(format!(
                "shared secret must be {} bytes, got {}",
                Self::LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }

    /// Parse a key from 64 hex characters.
    pub fn from_hex(value: &str) -> Result<Self, CryptoError> {
        let mut bytes = hex::decode(value.trim())
            .map_err(|e| CryptoError::KeyFormat(format!("shared secret is not hex: {e}")))?;
        let secret = Self::from_slice(&bytes);
        bytes.zeroize();
        secret
    }

    /// Generate a fresh random key.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut key = [0u8; Self::LEN];
        getrandom::fill(&mut key).map_err(|e| CryptoError::Randomness(e.to_string()))?;
        Ok(Self(key))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}
