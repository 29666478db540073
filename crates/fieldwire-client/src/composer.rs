//! Outbound telemetry frame construction.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use fieldwire_crypto::{DevicePrivateKey, SharedSecret, derive_forge_hash, seal};
use fieldwire_proto::{DeviceIdentity, EnvelopeBody, Frame, FrameHeader, TelemetryPayload};

use crate::ComposeError;

/// Builds sealed telemetry frames for one device.
///
/// Holds the device's identity, its signing key and the shared secret. Every
/// composed frame gets a fresh nonce.
pub struct Composer {
    identity: DeviceIdentity,
    signing_key: DevicePrivateKey,
    secret: SharedSecret,
}

impl Composer {
    /// Create a composer for `identity`.
    pub fn new(identity: DeviceIdentity, signing_key: DevicePrivateKey, secret: SharedSecret) -> Self {
        Self { identity, signing_key, secret }
    }

    /// Device this composer speaks for.
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Assemble and validate a payload, deriving its forge-resistance hash.
    pub fn payload(
        hardware_id: &str,
        installation_id: &str,
        device_time: i64,
        sent_at: i64,
    ) -> Result<TelemetryPayload, ComposeError> {
        let payload = TelemetryPayload {
            hardware_id: hardware_id.to_owned(),
            installation_id: installation_id.to_owned(),
            device_time,
            sent_at,
            forge_resistance: derive_forge_hash(installation_id)?,
        };
        payload.validate().map_err(ComposeError::Validation)?;
        Ok(payload)
    }

    /// Compose a telemetry frame stamped with the current wall-clock time.
    pub fn compose(
        &self,
        hardware_id: &str,
        installation_id: &str,
        device_time: i64,
    ) -> Result<Frame, ComposeError> {
        self.compose_at(hardware_id, installation_id, device_time, unix_now())
    }

    /// Compose a telemetry frame with an explicit send time.
    pub fn compose_at(
        &self,
        hardware_id: &str,
        installation_id: &str,
        device_time: i64,
        sent_at: i64,
    ) -> Result<Frame, ComposeError> {
        let payload = Self::payload(hardware_id, installation_id, device_time, sent_at)?;
        self.seal_payload(&payload)
    }

    /// Seal an already-built payload as-is.
    ///
    /// No validation happens here; a payload with a stale forge hash is
    /// sealed faithfully and left for the server to reject.
    pub fn seal_payload(&self, payload: &TelemetryPayload) -> Result<Frame, ComposeError> {
        self.seal_bytes(&payload.to_json()?)
    }

    /// Seal arbitrary plaintext into a telemetry frame.
    pub fn seal_bytes(&self, plaintext: &[u8]) -> Result<Frame, ComposeError> {
        let sealed = seal(plaintext, &self.secret, &self.signing_key)?;

        let size = EnvelopeBody::FIXED_LEN + sealed.ciphertext.len();
        if size > FrameHeader::MAX_BODY_LEN {
            return Err(ComposeError::PayloadTooLarge { size, max: FrameHeader::MAX_BODY_LEN });
        }

        let body = EnvelopeBody {
            identity: self.identity.clone(),
            signature: Bytes::from(sealed.signature),
            nonce: sealed.nonce,
            ciphertext: Bytes::from(sealed.ciphertext),
        };
        Ok(body.into_frame()?)
    }
}

impl std::fmt::Debug for Composer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composer").field("identity", &self.identity).finish_non_exhaustive()
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}
