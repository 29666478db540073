//! Telemetry persistence.

use std::sync::Mutex;

use async_trait::async_trait;
use fieldwire_proto::{DeviceIdentity, TelemetryPayload};
use thiserror::Error;

/// Identifier assigned to a persisted record.
pub type RecordId = u64;

/// Errors from the storage sink.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store rejected or failed the write
    #[error("storage backend failure: {0}")]
    Backend(String),

    /// The record could not be encoded for storage
    #[error("record encoding failed: {0}")]
    Encoding(String),
}

/// Destination for validated telemetry.
///
/// Called at most once per connection, only after the payload has been
/// authenticated, decrypted and validated.
#[async_trait]
pub trait TelemetrySink: Send + Sync + 'static {
    /// Persist one report and return its record id.
    async fn insert(
        &self,
        identity: &DeviceIdentity,
        payload: &TelemetryPayload,
    ) -> Result<RecordId, StorageError>;
}

/// A persisted report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// Assigned record id
    pub id: RecordId,
    /// Reporting device
    pub identity: DeviceIdentity,
    /// Validated payload
    pub payload: TelemetryPayload,
}

/// In-memory telemetry store for tests and simulation.
#[derive(Debug, Default)]
pub struct MemoryTelemetryStore {
    records: Mutex<Vec<StoredRecord>>,
}

impl MemoryTelemetryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything stored so far.
    pub fn records(&self) -> Vec<StoredRecord> {
        self.records.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }

    /// True if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TelemetrySink for MemoryTelemetryStore {
    async fn insert(
        &self,
        identity: &DeviceIdentity,
        payload: &TelemetryPayload,
    ) -> Result<RecordId, StorageError> {
        let mut records = self.records.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let id = records.len() as RecordId + 1;
        records.push(StoredRecord { id, identity: identity.clone(), payload: payload.clone() });
        Ok(id)
    }
}
