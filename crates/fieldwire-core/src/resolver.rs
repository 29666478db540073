//! Identity → public key resolution.

use std::{collections::HashMap, sync::RwLock};

use async_trait::async_trait;
use fieldwire_crypto::{CryptoError, DevicePublicKey};
use fieldwire_proto::DeviceIdentity;
use thiserror::Error;

/// Errors from public key lookup.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No key is registered for this identity
    #[error("unknown device: {0}")]
    UnknownDevice(DeviceIdentity),

    /// A key is registered but cannot be parsed into a public key
    #[error("stored key for {identity} is malformed: {source}")]
    KeyFormat {
        /// Device whose key is malformed
        identity: DeviceIdentity,
        /// Parse failure
        #[source]
        source: CryptoError,
    },

    /// The backing store failed
    #[error("key store failure: {0}")]
    Backend(String),
}

/// Read-only lookup of a device's registered public key.
///
/// Implementations must be safe for concurrent reads from many connection
/// tasks. The protocol core never writes keys; registration is a
/// provisioning concern.
#[async_trait]
pub trait KeyResolver: Send + Sync + 'static {
    /// Resolve `identity` to its single active public key.
    async fn lookup_public_key(
        &self,
        identity: &DeviceIdentity,
    ) -> Result<DevicePublicKey, ResolveError>;
}

/// In-memory key registry holding PEM-encoded keys.
///
/// Keys are parsed on every lookup, the same as a store that keeps raw key
/// text, so malformed registrations surface as [`ResolveError::KeyFormat`].
#[derive(Debug, Default)]
pub struct MemoryKeyRegistry {
    keys: RwLock<HashMap<DeviceIdentity, String>>,
}

impl MemoryKeyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `identity` to a PEM public key, replacing any previous binding.
    pub fn register(&self, identity: DeviceIdentity, public_key_pem: impl Into<String>) {
        let mut keys = self.keys.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        keys.insert(identity, public_key_pem.into());
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.keys.read().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }

    /// True if no device is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyResolver for MemoryKeyRegistry {
    async fn lookup_public_key(
        &self,
        identity: &DeviceIdentity,
    ) -> Result<DevicePublicKey, ResolveError> {
        let pem = {
            let keys = self.keys.read().unwrap_or_else(std::sync::PoisonError::into_inner);
            keys.get(identity).cloned()
        };

        let pem = pem.ok_or_else(|| ResolveError::UnknownDevice(identity.clone()))?;
        DevicePublicKey::from_pem(&pem)
            .map_err(|source| ResolveError::KeyFormat { identity: identity.clone(), source })
    }
}
