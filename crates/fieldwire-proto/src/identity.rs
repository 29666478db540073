//! Device identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, Result};

/// Fixed-length textual identifier naming one device (e.g. a hyphenated UUID).
///
/// Identities are assigned at provisioning time and are the lookup key for
/// the device's registered public key. They travel in the clear at the front
/// of every telemetry body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    /// Identity length on the wire.
    pub const LEN: usize = 36;

    /// Validate and wrap an identity string.
    ///
    /// The identity must be exactly [`Self::LEN`] bytes of printable ASCII.
    pub fn parse(value: &str) -> Result<Self> {
        Self::from_bytes(value.as_bytes())
    }

    /// Validate identity bytes read from the wire.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::LEN {
            return Err(ProtocolError::InvalidIdentity(format!(
                "expected {} bytes, got {}",
                Self::LEN,
                bytes.len()
            )));
        }
        if !bytes.iter().all(u8::is_ascii_graphic) {
            return Err(ProtocolError::InvalidIdentity("non-printable byte".to_string()));
        }

        // All bytes are ASCII, so this cannot fail
        let value = std::str::from_utf8(bytes)
            .map_err(|e| ProtocolError::InvalidIdentity(e.to_string()))?;
        Ok(Self(value.to_owned()))
    }

    /// Identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identity as wire bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DeviceIdentity {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DeviceIdentity> for String {
    fn from(identity: DeviceIdentity) -> Self {
        identity.0
    }
}
