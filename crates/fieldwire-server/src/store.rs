//! Persistent key registry and telemetry store backed by redb.
//!
//! One database file holds both tables:
//!
//! - `device_keys`: identity → PEM public key
//! - `telemetry`: record id → JSON-encoded [`TelemetryRecord`]
//!
//! redb transactions block, so the async trait impls hop onto the blocking
//! pool for every call.

use std::{
    path::Path,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use fieldwire_core::{KeyResolver, RecordId, ResolveError, StorageError, TelemetrySink};
use fieldwire_crypto::DevicePublicKey;
use fieldwire_proto::{DeviceIdentity, TelemetryPayload};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEVICE_KEYS: TableDefinition<&str, &str> = TableDefinition::new("device_keys");
const TELEMETRY: TableDefinition<u64, &[u8]> = TableDefinition::new("telemetry");

/// Errors from the redb store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database file could not be opened or created
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Transaction could not be started
    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Table could not be opened
    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    /// Read or write failed
    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    /// Commit failed
    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// Stored record could not be encoded or decoded
    #[error("record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Refused to register a key that does not parse
    #[error("invalid public key: {0}")]
    InvalidKey(#[from] fieldwire_crypto::CryptoError),

    /// Blocking task panicked or was cancelled
    #[error("storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A telemetry report as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Reporting device
    pub identity: DeviceIdentity,
    /// Validated payload
    pub payload: TelemetryPayload,
    /// Server receive time, seconds since the Unix epoch
    pub received_at: i64,
}

/// redb-backed [`KeyResolver`] and [`TelemetrySink`].
#[derive(Debug, Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open (or create) the database at `path` and make sure both tables
    /// exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        {
            txn.open_table(DEVICE_KEYS)?;
            txn.open_table(TELEMETRY)?;
        }
        txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Bind `identity` to a PEM public key, replacing any previous binding.
    ///
    /// The key is parsed first so a malformed key is never stored.
    pub fn register_device(
        &self,
        identity: &DeviceIdentity,
        public_key_pem: &str,
    ) -> Result<(), StoreError> {
        DevicePublicKey::from_pem(public_key_pem)?;

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(DEVICE_KEYS)?;
            table.insert(identity.as_str(), public_key_pem)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Stored PEM for `identity`, if registered.
    pub fn device_key(&self, identity: &DeviceIdentity) -> Result<Option<String>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(DEVICE_KEYS)?;
        Ok(table.get(identity.as_str())?.map(|v| v.value().to_owned()))
    }

    /// Append a record and return its id. Ids start at 1 and increase.
    pub fn append(
        &self,
        identity: &DeviceIdentity,
        payload: &TelemetryPayload,
    ) -> Result<RecordId, StoreError> {
        let record = TelemetryRecord {
            identity: identity.clone(),
            payload: payload.clone(),
            received_at: unix_now(),
        };
        let encoded = serde_json::to_vec(&record)?;

        let txn = self.db.begin_write()?;
        let id = {
            let mut table = txn.open_table(TELEMETRY)?;
            let id = table.last()?.map_or(1, |(k, _)| k.value() + 1);
            table.insert(id, encoded.as_slice())?;
            id
        };
        txn.commit()?;
        Ok(id)
    }

    /// Every stored record in id order.
    pub fn records(&self) -> Result<Vec<(RecordId, TelemetryRecord)>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(TELEMETRY)?;

        let mut records = Vec::new();
        for entry in table.iter()? {
            let (id, value) = entry?;
            records.push((id.value(), serde_json::from_slice(value.value())?));
        }
        Ok(records)
    }

    /// Number of stored records.
    pub fn record_count(&self) -> Result<u64, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(TELEMETRY)?;
        Ok(table.len()?)
    }
}

#[async_trait]
impl KeyResolver for RedbStore {
    async fn lookup_public_key(
        &self,
        identity: &DeviceIdentity,
    ) -> Result<DevicePublicKey, ResolveError> {
        let store = self.clone();
        let id = identity.clone();
        let pem = tokio::task::spawn_blocking(move || store.device_key(&id))
            .await
            .map_err(|e| ResolveError::Backend(e.to_string()))?
            .map_err(|e| ResolveError::Backend(e.to_string()))?
            .ok_or_else(|| ResolveError::UnknownDevice(identity.clone()))?;

        DevicePublicKey::from_pem(&pem)
            .map_err(|source| ResolveError::KeyFormat { identity: identity.clone(), source })
    }
}

#[async_trait]
impl TelemetrySink for RedbStore {
    async fn insert(
        &self,
        identity: &DeviceIdentity,
        payload: &TelemetryPayload,
    ) -> Result<RecordId, StorageError> {
        let store = self.clone();
        let (identity, payload) = (identity.clone(), payload.clone());
        tokio::task::spawn_blocking(move || store.append(&identity, &payload))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .map_err(|e| match e {
                StoreError::Encoding(e) => StorageError::Encoding(e.to_string()),
                other => StorageError::Backend(other.to_string()),
            })
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}
