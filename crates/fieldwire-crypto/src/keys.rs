//! Device RSA keys.
//!
//! Parsing is a fallible conversion into a typed key: key material of the
//! wrong kind, encoding, or size never reaches the envelope code.

use rand::rngs::OsRng;
use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey},
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding},
    traits::PublicKeyParts,
};
use zeroize::Zeroizing;

use crate::CryptoError;

/// Modulus size every device key must have.
pub const KEY_BITS: usize = 2048;

const KEY_BYTES: usize = KEY_BITS / 8;

/// A device's registered public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePublicKey(RsaPublicKey);

impl DevicePublicKey {
    /// Parse a PEM public key.
    ///
    /// Accepts SubjectPublicKeyInfo (`PUBLIC KEY`) and PKCS#1
    /// (`RSA PUBLIC KEY`) encodings.
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let key = RsaPublicKey::from_public_key_pem(pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
            .map_err(|e| CryptoError::KeyFormat(format!("unparseable public key: {e}")))?;
        Self::from_rsa(key)
    }

    /// Parse a DER SubjectPublicKeyInfo.
    pub fn from_der(der: &[u8]) -> Result<Self, CryptoError> {
        let key = RsaPublicKey::from_public_key_der(der)
            .map_err(|e| CryptoError::KeyFormat(format!("unparseable public key: {e}")))?;
        Self::from_rsa(key)
    }

    fn from_rsa(key: RsaPublicKey) -> Result<Self, CryptoError> {
        check_size(key.size())?;
        Ok(Self(key))
    }

    /// Encode as SubjectPublicKeyInfo PEM.
    pub fn to_pem(&self) -> Result<String, CryptoError> {
        self.0
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyFormat(e.to_string()))
    }

    /// Signature length this key produces, in bytes.
    pub fn signature_len(&self) -> usize {
        self.0.size()
    }

    pub(crate) fn as_rsa(&self) -> &RsaPublicKey {
        &self.0
    }
}

/// A device's private signing key. Never leaves the device.
#[derive(Clone)]
pub struct DevicePrivateKey(RsaPrivateKey);

impl DevicePrivateKey {
    /// Generate a fresh 2048-bit key pair.
    pub fn generate() -> Result<Self, CryptoError> {
        let key = RsaPrivateKey::new(&mut OsRng, KEY_BITS)
            .map_err(|e| CryptoError::KeyFormat(format!("key generation failed: {e}")))?;
        Ok(Self(key))
    }

    /// Parse a PEM private key in PKCS#8 (`PRIVATE KEY`) or PKCS#1
    /// (`RSA PRIVATE KEY`) encoding.
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| CryptoError::KeyFormat(format!("unparseable private key: {e}")))?;
        check_size(key.size())?;
        Ok(Self(key))
    }

    /// Encode as PKCS#8 PEM.
    pub fn to_pem(&self) -> Result<Zeroizing<String>, CryptoError> {
        self.0.to_pkcs8_pem(LineEnding::LF).map_err(|e| CryptoError::KeyFormat(e.to_string()))
    }

    /// Matching public key.
    pub fn public_key(&self) -> DevicePublicKey {
        DevicePublicKey(self.0.to_public_key())
    }

    pub(crate) fn as_rsa(&self) -> &RsaPrivateKey {
        &self.0
    }
}

impl std::fmt::Debug for DevicePrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DevicePrivateKey(<redacted>)")
    }
}

fn check_size(size: usize) -> Result<(), CryptoError> {
    if size == KEY_BYTES {
        Ok(())
    } else {
        Err(CryptoError::KeyFormat(format!("expected a {KEY_BITS}-bit modulus, got {} bits", size * 8)))
    }
}
