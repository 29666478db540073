//! Plain TCP transport.
//!
//! No security handshake: `secure` hands the socket straight back. Used for
//! local testing and behind a TLS-terminating proxy.

use std::{io, net::SocketAddr};

use async_trait::async_trait;
use fieldwire_core::Transport;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

/// TCP listener implementing [`Transport`].
#[derive(Debug)]
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Bind to `addr`.
    pub async fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        Ok(Self { listener: TcpListener::bind(addr).await? })
    }

    /// Address actually bound (useful after binding port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

#[async_trait]
impl Transport for TcpTransport {
    type Incoming = TcpStream;
    type Stream = TcpStream;

    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        Ok((stream, peer))
    }

    async fn secure(&self, incoming: TcpStream) -> io::Result<TcpStream> {
        Ok(incoming)
    }
}
