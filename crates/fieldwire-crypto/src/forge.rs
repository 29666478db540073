//! Forge-resistance hash.
//!
//! The hash is derived from the installation identifier by a fixed
//! convention: drop the first and last three characters, append a constant
//! suffix, SHA-256, hex. Holding the shared secret is not enough to produce
//! an accepted payload; the sender must also follow this convention.

use sha2::{Digest, Sha256};

use crate::CryptoError;

const TRIM: usize = 3;
const SUFFIX: &[u8] = b"_forge_resistance";

/// Shortest input that survives trimming with at least one character left.
pub const MIN_INPUT_LEN: usize = 2 * TRIM + 1;

/// Derive the hex forge-resistance hash for an installation identifier.
pub fn derive_forge_hash(installation_id: &str) -> Result<String, CryptoError> {
    let bytes = installation_id.as_bytes();
    if bytes.len() < MIN_INPUT_LEN {
        return Err(CryptoError::ForgeInputTooShort { len: bytes.len(), min: MIN_INPUT_LEN });
    }

    let mut hasher = Sha256::new();
    hasher.update(&bytes[TRIM..bytes.len() - TRIM]);
    hasher.update(SUFFIX);
    Ok(hex::encode(hasher.finalize()))
}

/// Recompute the hash for `installation_id` and compare it to `claimed`.
///
/// The comparison is exact: only the lowercase hex that
/// [`derive_forge_hash`] produces is accepted.
pub fn verify_forge_hash(installation_id: &str, claimed: &str) -> Result<bool, CryptoError> {
    let expected = derive_forge_hash(installation_id)?;
    Ok(expected == claimed)
}
