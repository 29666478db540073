//! Per-connection session handler.
//!
//! One frame in, at most one acknowledgment out. Every failure closes the
//! connection without writing anything, so a peer cannot tell which check
//! rejected it.

use std::sync::Arc;

use fieldwire_core::{SessionState, read_frame};
use fieldwire_proto::ACK;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::{
    SessionError,
    config::SessionConfig,
    dispatch::{DispatchTable, Outcome},
};

/// Processes a single device connection.
///
/// Cheap to share between connection tasks: the dispatch table and every
/// collaborator behind it are read-only.
#[derive(Debug, Clone)]
pub struct Session {
    table: Arc<DispatchTable>,
    config: SessionConfig,
}

impl Session {
    /// Create a session handler over a dispatch table.
    pub fn new(table: DispatchTable, config: SessionConfig) -> Self {
        Self { table: Arc::new(table), config }
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run one connection to completion.
    ///
    /// Reads one frame (bounded by the read deadline), dispatches it, and on
    /// success writes [`ACK`] and shuts the stream down. On failure nothing
    /// is written; the caller drops the stream to close it.
    pub async fn run<S>(&self, stream: &mut S) -> Result<Outcome, SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        trace!(state = %SessionState::AwaitFrame);
        let frame = tokio::time::timeout(self.config.read_timeout, read_frame(stream))
            .await
            .map_err(|_| SessionError::ReadTimeout(self.config.read_timeout))?
            .map_err(SessionError::Frame)?;

        trace!(state = %SessionState::Dispatch, frame_type = frame.header.raw_type(), len = frame.body.len());
        let outcome = self.table.dispatch(frame).await?;

        trace!(state = %SessionState::Acknowledge);
        stream.write_all(ACK).await.map_err(SessionError::Acknowledge)?;
        stream.flush().await.map_err(SessionError::Acknowledge)?;

        // The acknowledgment is already out; a failed close is not worth failing for
        if let Err(e) = stream.shutdown().await {
            debug!(error = %e, "shutdown after acknowledgment failed");
        }

        trace!(state = %SessionState::Closed);
        Ok(outcome)
    }
}
