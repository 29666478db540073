//! Frame type → handler routing.
//!
//! The table is explicit: a frame type with no entry is closed without a
//! response, so adding a message kind means registering a handler, never
//! guessing at behavior for unknown tags.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use fieldwire_core::{KeyResolver, RecordId, TelemetrySink};
use fieldwire_crypto::SharedSecret;
use fieldwire_proto::{Frame, FrameType, ProtocolError};

use crate::{SessionError, telemetry::TelemetryHandler};

/// Result of a successfully handled frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Telemetry was persisted under this record id
    Stored(RecordId),
    /// Frame accepted with nothing persisted
    Accepted,
}

/// Handler for one frame type.
#[async_trait]
pub trait FrameHandler: Send + Sync + 'static {
    /// Smallest body this frame type can carry.
    ///
    /// Checked by the dispatcher before the handler sees the body.
    fn min_body_len(&self) -> usize {
        0
    }

    /// Process one frame body.
    async fn handle(&self, body: Bytes) -> Result<Outcome, SessionError>;
}

/// Placeholder for frame types that are reserved but have no behavior yet.
///
/// Accepts any body and acknowledges it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

#[async_trait]
impl FrameHandler for NoopHandler {
    async fn handle(&self, _body: Bytes) -> Result<Outcome, SessionError> {
        Ok(Outcome::Accepted)
    }
}

/// Routing table from frame type to handler.
#[derive(Default, Clone)]
pub struct DispatchTable {
    handlers: HashMap<FrameType, Arc<dyn FrameHandler>>,
}

impl DispatchTable {
    /// Create an empty table. Every frame is unrouted until registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// The protocol's standard table: telemetry, plus no-op placeholders for
    /// the reserved key-exchange and test types.
    pub fn standard(
        secret: Arc<SharedSecret>,
        resolver: Arc<dyn KeyResolver>,
        sink: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self::new()
            .with(FrameType::Telemetry, Arc::new(TelemetryHandler::new(secret, resolver, sink)))
            .with(FrameType::KeyExchange, Arc::new(NoopHandler))
            .with(FrameType::Test, Arc::new(NoopHandler))
    }

    /// Register (or replace) the handler for `frame_type`.
    #[must_use]
    pub fn with(mut self, frame_type: FrameType, handler: Arc<dyn FrameHandler>) -> Self {
        self.handlers.insert(frame_type, handler);
        self
    }

    /// True if `frame_type` has a handler.
    pub fn routes(&self, frame_type: FrameType) -> bool {
        self.handlers.contains_key(&frame_type)
    }

    /// Route a decoded frame to its handler.
    pub async fn dispatch(&self, frame: Frame) -> Result<Outcome, SessionError> {
        let tag = frame.header.raw_type();
        let (frame_type, handler) = FrameType::from_u8(tag)
            .and_then(|t| self.handlers.get(&t).map(|h| (t, h)))
            .ok_or(SessionError::Unrouted(tag))?;

        let min = handler.min_body_len();
        if frame.body.len() < min {
            return Err(SessionError::Body(ProtocolError::BodyTooShort {
                frame_type,
                size: frame.body.len(),
                min,
            }));
        }

        handler.handle(frame.body).await
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut routed: Vec<_> = self.handlers.keys().collect();
        routed.sort_by_key(|t| t.to_u8());
        f.debug_struct("DispatchTable").field("routes", &routed).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(usize);

    #[async_trait]
    impl FrameHandler for Fixed {
        fn min_body_len(&self) -> usize {
            self.0
        }

        async fn handle(&self, body: Bytes) -> Result<Outcome, SessionError> {
            Ok(Outcome::Stored(body.len() as RecordId))
        }
    }

    #[tokio::test]
    async fn routes_to_registered_handler() {
        let table = DispatchTable::new().with(FrameType::Test, Arc::new(Fixed(0)));
        let frame = Frame::new(FrameType::Test, vec![0; 5]).unwrap();

        assert_eq!(table.dispatch(frame).await.unwrap(), Outcome::Stored(5));
    }

    #[tokio::test]
    async fn unregistered_known_type_is_unrouted() {
        let table = DispatchTable::new().with(FrameType::Test, Arc::new(NoopHandler));
        let frame = Frame::new(FrameType::KeyExchange, Vec::new()).unwrap();

        assert!(matches!(table.dispatch(frame).await, Err(SessionError::Unrouted(0x02))));
    }

    #[tokio::test]
    async fn unknown_tag_is_unrouted() {
        let table = DispatchTable::new().with(FrameType::Test, Arc::new(NoopHandler));
        let frame = Frame::with_raw_type(0x99, Vec::new()).unwrap();

        assert!(matches!(table.dispatch(frame).await, Err(SessionError::Unrouted(0x99))));
    }

    #[tokio::test]
    async fn minimum_is_per_type() {
        let table = DispatchTable::new()
            .with(FrameType::Telemetry, Arc::new(Fixed(10)))
            .with(FrameType::Test, Arc::new(Fixed(0)));

        let short = Frame::new(FrameType::Telemetry, vec![0; 9]).unwrap();
        assert!(matches!(
            table.dispatch(short).await,
            Err(SessionError::Body(ProtocolError::BodyTooShort { size: 9, min: 10, .. }))
        ));

        let empty_test = Frame::new(FrameType::Test, Vec::new()).unwrap();
        assert!(table.dispatch(empty_test).await.is_ok());
    }

    #[tokio::test]
    async fn placeholders_acknowledge() {
        let table = DispatchTable::new()
            .with(FrameType::KeyExchange, Arc::new(NoopHandler))
            .with(FrameType::Test, Arc::new(NoopHandler));

        for frame_type in [FrameType::KeyExchange, FrameType::Test] {
            let frame = Frame::new(frame_type, vec![1, 2, 3]).unwrap();
            assert_eq!(table.dispatch(frame).await.unwrap(), Outcome::Accepted);
        }
    }
}
