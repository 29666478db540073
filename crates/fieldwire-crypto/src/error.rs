//! Crypto error types.

use thiserror::Error;

/// Errors from envelope construction, verification and key handling.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// AES-GCM encryption could not run (bad key size)
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// RSA signing failed
    #[error("signing failed: {0}")]
    Signing(String),

    /// Signature did not verify against the device's public key
    #[error("signature verification failed, integrity compromised")]
    Authentication,

    /// AES-GCM tag check failed
    #[error("decryption failed")]
    Decryption,

    /// Key material could not be parsed or has the wrong size
    #[error("invalid key: {0}")]
    KeyFormat(String),

    /// Forge-resistance input too short to trim
    #[error("forge-resistance input too short: {len} characters (min {min})")]
    ForgeInputTooShort {
        /// Input length
        len: usize,
        /// Minimum length
        min: usize,
    },

    /// OS randomness source failed
    #[error("randomness unavailable: {0}")]
    Randomness(String),
}
