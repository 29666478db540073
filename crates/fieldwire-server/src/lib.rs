//! Fieldwire telemetry collector
//!
//! Accepts TLS connections from field devices, reads exactly one frame per
//! connection, and for telemetry frames runs the full pipeline:
//!
//! ```text
//! AwaitFrame → Dispatch → Authenticate → Decrypt → Validate → Persist → Acknowledge
//! ```
//!
//! Any failure closes the connection without a response. Success writes the
//! acknowledgment `ty\n` and closes.
//!
//! # Components
//!
//! - [`Acceptor`]: accept loop, one task per connection
//! - [`Session`]: single-frame connection handler
//! - [`DispatchTable`]: frame type → [`FrameHandler`]
//! - [`TelemetryHandler`]: authenticated telemetry ingestion
//! - [`RedbStore`]: persistent key registry and telemetry store
//! - [`TlsTransport`] / [`TcpTransport`]: transports

pub mod acceptor;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod session;
pub mod store;
pub mod tcp;
pub mod telemetry;
pub mod tls;

pub use acceptor::Acceptor;
pub use config::{SessionConfig, SpawnPolicy};
pub use dispatch::{DispatchTable, FrameHandler, NoopHandler, Outcome};
pub use error::{ServerError, SessionError};
pub use session::Session;
pub use store::{RedbStore, StoreError, TelemetryRecord};
pub use tcp::TcpTransport;
pub use telemetry::TelemetryHandler;
pub use tls::{SelfSigned, TlsTransport, load_server_config, self_signed};
