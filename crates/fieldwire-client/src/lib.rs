//! Fieldwire device client
//!
//! Builds sealed telemetry frames on the device side and, with the
//! `transport` feature, submits them to a collector over TLS.
//!
//! ```text
//! fields → TelemetryPayload (+ forge hash) → JSON → seal → EnvelopeBody → Frame
//! ```

pub mod composer;
pub mod error;
#[cfg(feature = "transport")]
pub mod transport;

pub use composer::Composer;
pub use error::ComposeError;
#[cfg(feature = "transport")]
pub use transport::{TlsDialer, submit};
