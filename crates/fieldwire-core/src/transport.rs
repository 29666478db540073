//! Transport abstraction for the connection acceptor.
//!
//! Production uses TLS over TCP, tests use plain TCP or Turmoil's simulated
//! network. Accepting a connection and securing it are separate steps so
//! the acceptor can hand the (possibly slow) handshake to the connection's
//! own task and go straight back to accepting.

use std::{io, net::SocketAddr};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// Source of incoming device connections.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// A connection that has been accepted but not yet secured.
    type Incoming: Send + 'static;

    /// A secured, bidirectional byte stream.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Accept the next incoming connection.
    ///
    /// Blocks until a peer connects. Must not perform the security
    /// handshake.
    async fn accept(&self) -> io::Result<(Self::Incoming, SocketAddr)>;

    /// Complete the security handshake on an accepted connection.
    ///
    /// Runs inside the connection's task, never on the accept loop.
    async fn secure(&self, incoming: Self::Incoming) -> io::Result<Self::Stream>;
}
