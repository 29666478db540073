//! Seal and open telemetry payloads.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use fieldwire_proto::NONCE_SIZE;
use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256};

use crate::{CryptoError, DevicePrivateKey, DevicePublicKey, SharedSecret};

/// Output of [`seal`]. Each part travels in the clear next to the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// AES-256-GCM ciphertext with the tag appended
    pub ciphertext: Vec<u8>,
    /// Fresh nonce used for this message only
    pub nonce: [u8; NONCE_SIZE],
    /// PKCS#1 v1.5 signature over SHA-256(ciphertext)
    pub signature: Vec<u8>,
}

/// Encrypt then sign a payload.
///
/// The signature covers the ciphertext rather than the plaintext, so the
/// receiver can check integrity before decrypting anything.
pub fn seal(
    payload: &[u8],
    secret: &SharedSecret,
    signing_key: &DevicePrivateKey,
) -> Result<Sealed, CryptoError> {
    let mut nonce = [0u8; NONCE_SIZE];
    getrandom::fill(&mut nonce).map_err(|e| CryptoError::Randomness(e.to_string()))?;

    let cipher = Aes256Gcm::new_from_slice(secret.as_bytes())
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), payload)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let digest = Sha256::digest(&ciphertext);
    let signature = signing_key
        .as_rsa()
        .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .map_err(|e| CryptoError::Signing(e.to_string()))?;

    Ok(Sealed { ciphertext, nonce, signature })
}

/// Verify then decrypt a payload.
///
/// Returns [`CryptoError::Authentication`] if the signature does not match,
/// without touching the AEAD. Returns [`CryptoError::Decryption`] if the
/// signature matched but the GCM tag did not.
pub fn open(
    ciphertext: &[u8],
    nonce: &[u8; NONCE_SIZE],
    signature: &[u8],
    secret: &SharedSecret,
    verifying_key: &DevicePublicKey,
) -> Result<Vec<u8>, CryptoError> {
    let digest = Sha256::digest(ciphertext);
    verifying_key
        .as_rsa()
        .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
        .map_err(|_| CryptoError::Authentication)?;

    let cipher = Aes256Gcm::new_from_slice(secret.as_bytes())
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    cipher.decrypt(Nonce::from_slice(nonce), ciphertext).map_err(|_| CryptoError::Decryption)
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use super::*;

    static KEY: LazyLock<DevicePrivateKey> = LazyLock::new(|| DevicePrivateKey::generate().unwrap());

    fn secret() -> SharedSecret {
        SharedSecret::new([0x11; 32])
    }

    #[test]
    fn roundtrip() {
        let sealed = seal(b"visit report", &secret(), &KEY).unwrap();
        let opened =
            open(&sealed.ciphertext, &sealed.nonce, &sealed.signature, &secret(), &KEY.public_key())
                .unwrap();
        assert_eq!(opened, b"visit report");
    }

    #[test]
    fn empty_payload_roundtrip() {
        let sealed = seal(b"", &secret(), &KEY).unwrap();
        assert_eq!(sealed.ciphertext.len(), 16);

        let opened =
            open(&sealed.ciphertext, &sealed.nonce, &sealed.signature, &secret(), &KEY.public_key())
                .unwrap();
        assert!(opened.is_empty());
    }

    #[test]
    fn signature_is_modulus_sized() {
        let sealed = seal(b"x", &secret(), &KEY).unwrap();
        assert_eq!(sealed.signature.len(), 256);
    }

    #[test]
    fn nonces_are_fresh() {
        let a = seal(b"same", &secret(), &KEY).unwrap();
        let b = seal(b"same", &secret(), &KEY).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn wrong_public_key_fails_authentication() {
        let other = DevicePrivateKey::generate().unwrap();
        let sealed = seal(b"payload", &secret(), &KEY).unwrap();

        let result =
            open(&sealed.ciphertext, &sealed.nonce, &sealed.signature, &secret(), &other.public_key());
        assert!(matches!(result, Err(CryptoError::Authentication)));
    }

    #[test]
    fn wrong_shared_secret_fails_decryption() {
        let sealed = seal(b"payload", &secret(), &KEY).unwrap();
        let wrong = SharedSecret::new([0x22; 32]);

        let result =
            open(&sealed.ciphertext, &sealed.nonce, &sealed.signature, &wrong, &KEY.public_key());
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn tampered_ciphertext_fails_before_decryption() {
        let sealed = seal(b"payload", &secret(), &KEY).unwrap();
        let mut ciphertext = sealed.ciphertext.clone();
        ciphertext[0] ^= 0x01;

        // Signature check rejects it, so the AEAD never sees the tampered bytes
        let result = open(&ciphertext, &sealed.nonce, &sealed.signature, &secret(), &KEY.public_key());
        assert!(matches!(result, Err(CryptoError::Authentication)));
    }

    #[test]
    fn tampered_nonce_fails_decryption() {
        let sealed = seal(b"payload", &secret(), &KEY).unwrap();
        let mut nonce = sealed.nonce;
        nonce[11] ^= 0x80;

        let result = open(&sealed.ciphertext, &nonce, &sealed.signature, &secret(), &KEY.public_key());
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn truncated_signature_fails_authentication() {
        let sealed = seal(b"payload", &secret(), &KEY).unwrap();
        let result = open(
            &sealed.ciphertext,
            &sealed.nonce,
            &sealed.signature[..255],
            &secret(),
            &KEY.public_key(),
        );
        assert!(matches!(result, Err(CryptoError::Authentication)));
    }
}
