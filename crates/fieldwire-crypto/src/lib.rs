//! Cryptographic envelope for device telemetry.
//!
//! Two layers wrap every payload. AES-256-GCM under a pre-shared deployment
//! key gives confidentiality. An RSA PKCS#1 v1.5 signature over the SHA-256
//! of the ciphertext binds the frame to the device's private key. A third,
//! content-bound check (the forge-resistance hash) rejects payloads built by
//! parties who hold the shared key but not the payload convention.
//!
//! # Ordering
//!
//! [`open`] verifies the signature before attempting decryption. Tampered
//! ciphertext is never fed to the AEAD, so the server cannot be used as a
//! decryption oracle.
//!
//! # Components
//!
//! - [`envelope`]: [`seal`] / [`open`]
//! - [`forge`]: forge-resistance hash derivation
//! - [`keys`]: RSA key parsing, encoding and generation
//! - [`secret`]: the pre-shared symmetric key

pub mod envelope;
pub mod error;
pub mod forge;
pub mod keys;
pub mod secret;

pub use envelope::{Sealed, open, seal};
pub use error::CryptoError;
pub use forge::{derive_forge_hash, verify_forge_hash};
pub use keys::{DevicePrivateKey, DevicePublicKey, KEY_BITS};
pub use secret::SharedSecret;
