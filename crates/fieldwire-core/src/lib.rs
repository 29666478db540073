//! Fieldwire protocol core
//!
//! The seams between the protocol and the outside world: how frames are read
//! from and written to a byte stream, how a device identity is resolved to
//! its public key, where validated telemetry goes, and how secured
//! connections are accepted.
//!
//! Everything here is runtime-agnostic. The server crate supplies TCP and TLS
//! transports and a persistent store; tests supply in-memory ones.
//!
//! # Components
//!
//! - [`codec`]: async frame reader/writer over any `AsyncRead`/`AsyncWrite`
//! - [`resolver`]: identity → public key lookup
//! - [`sink`]: telemetry persistence
//! - [`transport`]: connection acceptance abstraction
//! - [`session`]: per-connection processing stages

pub mod codec;
pub mod resolver;
pub mod session;
pub mod sink;
pub mod transport;

pub use codec::{read_frame, write_frame};
pub use resolver::{KeyResolver, MemoryKeyRegistry, ResolveError};
pub use session::SessionState;
pub use sink::{MemoryTelemetryStore, RecordId, StorageError, StoredRecord, TelemetrySink};
pub use transport::Transport;
