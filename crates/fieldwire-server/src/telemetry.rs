//! Telemetry frame handler.
//!
//! Authenticate → Decrypt → Validate → Persist, strictly in that order. Each
//! step consumes the previous step's output, and the signature is always
//! verified before the ciphertext is decrypted.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use fieldwire_core::{KeyResolver, TelemetrySink};
use fieldwire_crypto::{CryptoError, SharedSecret, open, verify_forge_hash};
use fieldwire_proto::{EnvelopeBody, TelemetryPayload};
use tracing::debug;

use crate::{
    SessionError,
    dispatch::{FrameHandler, Outcome},
};

/// Handler for [`fieldwire_proto::FrameType::Telemetry`] frames.
pub struct TelemetryHandler {
    secret: Arc<SharedSecret>,
    resolver: Arc<dyn KeyResolver>,
    sink: Arc<dyn TelemetrySink>,
}

impl TelemetryHandler {
    /// Create a handler over a shared secret, key resolver and sink.
    pub fn new(
        secret: Arc<SharedSecret>,
        resolver: Arc<dyn KeyResolver>,
        sink: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self { secret, resolver, sink }
    }
}

#[async_trait]
impl FrameHandler for TelemetryHandler {
    fn min_body_len(&self) -> usize {
        EnvelopeBody::MIN_LEN
    }

    async fn handle(&self, body: Bytes) -> Result<Outcome, SessionError> {
        let envelope = EnvelopeBody::parse(&body).map_err(SessionError::Body)?;
        let identity = &envelope.identity;

        let public_key = self.resolver.lookup_public_key(identity).await?;
        let plaintext = open(
            &envelope.ciphertext,
            &envelope.nonce,
            &envelope.signature,
            &self.secret,
            &public_key,
        )
        .map_err(|e| match e {
            CryptoError::Authentication => SessionError::Authentication(e),
            other => SessionError::Decryption(other),
        })?;
        debug!(%identity, bytes = plaintext.len(), "envelope opened");

        let payload = TelemetryPayload::from_json(&plaintext).map_err(SessionError::Payload)?;
        validate(&payload)?;

        let record = self.sink.insert(identity, &payload).await?;
        debug!(%identity, record, "telemetry persisted");

        Ok(Outcome::Stored(record))
    }
}

fn validate(payload: &TelemetryPayload) -> Result<(), SessionError> {
    payload.validate().map_err(|e| SessionError::Validation(e.to_string()))?;

    let genuine = verify_forge_hash(&payload.installation_id, &payload.forge_resistance)
        .map_err(|e| SessionError::Validation(e.to_string()))?;
    if genuine { Ok(()) } else { Err(SessionError::ForgeHashMismatch) }
}
