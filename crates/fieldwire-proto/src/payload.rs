//! Decrypted telemetry record.

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, Result};

/// A device's visit report, carried JSON-encoded inside the ciphertext.
///
/// JSON keys are the ones deployed devices already send, not the Rust field
/// names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryPayload {
    /// Hardware identifier of the visited unit (`AA:BB:CC:DD:EE:FF`)
    #[serde(rename = "PayphoneMAC")]
    pub hardware_id: String,
    /// Installation identifier, exactly 40 characters
    #[serde(rename = "PayphoneID")]
    pub installation_id: String,
    /// Device-reported time of the visit (epoch seconds)
    #[serde(rename = "PayphoneTime")]
    pub device_time: i64,
    /// Wall-clock time the report was sent (epoch seconds)
    #[serde(rename = "Time")]
    pub sent_at: i64,
    /// Lowercase hex SHA-256 derived from `installation_id`
    #[serde(rename = "ForgeResistance")]
    pub forge_resistance: String,
}

impl TelemetryPayload {
    /// Hardware identifier length.
    pub const HARDWARE_ID_LEN: usize = 17;

    /// Installation identifier length.
    pub const INSTALLATION_ID_LEN: usize = 40;

    /// Forge-resistance hash length (hex SHA-256).
    pub const FORGE_HASH_LEN: usize = 64;

    /// Check the field-shape invariants.
    ///
    /// This does not check the forge-resistance hash against the
    /// installation identifier; that needs the hashing convention held by
    /// the crypto layer.
    pub fn validate(&self) -> Result<()> {
        validate_hardware_id(&self.hardware_id)?;

        if self.installation_id.len() != Self::INSTALLATION_ID_LEN {
            return Err(ProtocolError::InvalidPayload(format!(
                "installation id must be {} characters, got {}",
                Self::INSTALLATION_ID_LEN,
                self.installation_id.len()
            )));
        }

        if self.forge_resistance.len() != Self::FORGE_HASH_LEN
            || !self.forge_resistance.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(ProtocolError::InvalidPayload(
                "forge-resistance hash must be 64 hex characters".to_string(),
            ));
        }

        Ok(())
    }

    /// Encode as JSON plaintext.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode JSON plaintext.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Six colon-separated hex pairs.
fn validate_hardware_id(value: &str) -> Result<()> {
    let bytes = value.as_bytes();
    if bytes.len() != TelemetryPayload::HARDWARE_ID_LEN {
        return Err(ProtocolError::InvalidPayload(format!(
            "hardware id must be {} characters, got {}",
            TelemetryPayload::HARDWARE_ID_LEN,
            bytes.len()
        )));
    }

    let well_formed = bytes.iter().enumerate().all(|(i, b)| {
        if i % 3 == 2 { *b == b':' } else { b.is_ascii_hexdigit() }
    });
    if !well_formed {
        return Err(ProtocolError::InvalidPayload(format!(
            "hardware id {value:?} is not colon-separated hex pairs"
        )));
    }

    Ok(())
}
