//! TLS dialer and single-frame submission.

use std::{fs::File, io, io::BufReader, path::Path, sync::Arc};

use fieldwire_core::write_frame;
use fieldwire_proto::{ACK, Frame, ProtocolError};
use rustls::{ClientConfig, RootCertStore, pki_types::ServerName};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite},
    net::{TcpStream, ToSocketAddrs},
};
use tokio_rustls::{TlsConnector, client::TlsStream};
use tracing::debug;

use crate::ComposeError;

/// Most bytes read back from the server. Anything longer than the
/// acknowledgment is already a failure.
const RESPONSE_LIMIT: u64 = 64;

/// Opens TLS connections to one collector.
#[derive(Clone)]
pub struct TlsDialer {
    connector: TlsConnector,
    server_name: ServerName<'static>,
}

impl TlsDialer {
    /// Dial `server_name`, trusting only `roots`.
    pub fn with_roots(roots: RootCertStore, server_name: &str) -> Result<Self, ComposeError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| ComposeError::Tls(e.to_string()))?
            .with_root_certificates(roots)
            .with_no_client_auth();

        let server_name = ServerName::try_from(server_name.to_owned())
            .map_err(|e| ComposeError::Tls(e.to_string()))?;

        Ok(Self { connector: TlsConnector::from(Arc::new(config)), server_name })
    }

    /// Dial `server_name`, trusting the PEM certificates in `ca_path`.
    pub fn with_ca_file(ca_path: &Path, server_name: &str) -> Result<Self, ComposeError> {
        let mut roots = RootCertStore::empty();
        for cert in rustls_pemfile::certs(&mut BufReader::new(File::open(ca_path)?)) {
            roots.add(cert?).map_err(|e| ComposeError::Tls(e.to_string()))?;
        }
        if roots.is_empty() {
            return Err(ComposeError::Tls(format!("no certificates in {}", ca_path.display())));
        }
        Self::with_roots(roots, server_name)
    }

    /// Connect and complete the TLS handshake.
    pub async fn connect(
        &self,
        addr: impl ToSocketAddrs,
    ) -> Result<TlsStream<TcpStream>, ComposeError> {
        let tcp = TcpStream::connect(addr).await?;
        tcp.set_nodelay(true)?;
        Ok(self.connector.connect(self.server_name.clone(), tcp).await?)
    }
}

impl std::fmt::Debug for TlsDialer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsDialer").field("server_name", &self.server_name).finish_non_exhaustive()
    }
}

/// Send one frame and wait for the server to acknowledge it.
///
/// Reads until the server closes. Anything other than exactly [`ACK`],
/// including an abrupt close with no data, is
/// [`ComposeError::NotAcknowledged`].
pub async fn submit<S>(stream: &mut S, frame: &Frame) -> Result<(), ComposeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    write_frame(stream, frame).await.map_err(|e| match e {
        ProtocolError::Io(e) => ComposeError::Io(e),
        other => ComposeError::Protocol(other),
    })?;
    debug!(len = frame.encoded_len(), "frame sent");

    let mut received = Vec::new();
    match (&mut *stream).take(RESPONSE_LIMIT).read_to_end(&mut received).await {
        Ok(_) => {},
        // Servers reject by dropping the socket, which TLS reports as a truncated stream
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {},
        Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {},
        Err(e) => return Err(e.into()),
    }

    if received == ACK {
        Ok(())
    } else {
        Err(ComposeError::NotAcknowledged { received })
    }
}
