//! TLS transport and server certificate loading.

use std::{fs::File, io, io::BufReader, net::SocketAddr, path::Path, sync::Arc};

use async_trait::async_trait;
use fieldwire_core::Transport;
use rustls::{
    ServerConfig,
    pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer},
};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio_rustls::{TlsAcceptor, server::TlsStream};

use crate::ServerError;

/// TLS-over-TCP listener implementing [`Transport`].
///
/// `accept` only takes the TCP connection; the handshake happens in
/// `secure`, inside the connection's own task.
pub struct TlsTransport {
    listener: TcpListener,
    acceptor: TlsAcceptor,
}

impl TlsTransport {
    /// Bind to `addr` and serve with `config`.
    pub async fn bind(addr: impl ToSocketAddrs, config: Arc<ServerConfig>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, acceptor: TlsAcceptor::from(config) })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl std::fmt::Debug for TlsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsTransport").field("listener", &self.listener).finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for TlsTransport {
    type Incoming = TcpStream;
    type Stream = TlsStream<TcpStream>;

    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        Ok((stream, peer))
    }

    async fn secure(&self, incoming: TcpStream) -> io::Result<Self::Stream> {
        self.acceptor.accept(incoming).await
    }
}

/// Build a server config from a PEM certificate chain and PEM private key
/// (PKCS#8, PKCS#1 or SEC1).
pub fn load_server_config(
    cert_path: &Path,
    key_path: &Path,
) -> Result<Arc<ServerConfig>, ServerError> {
    let certs = rustls_pemfile::certs(&mut BufReader::new(File::open(cert_path)?))
        .collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(ServerError::Tls(format!("no certificates in {}", cert_path.display())));
    }

    let key = rustls_pemfile::private_key(&mut BufReader::new(File::open(key_path)?))?
        .ok_or_else(|| ServerError::Tls(format!("no private key in {}", key_path.display())))?;

    server_config(certs, key)
}

/// An ephemeral self-signed certificate and the config serving it.
pub struct SelfSigned {
    /// Server config presenting the certificate
    pub config: Arc<ServerConfig>,
    /// The certificate, for clients to trust
    pub certificate: CertificateDer<'static>,
    /// The certificate in PEM form
    pub certificate_pem: String,
}

impl std::fmt::Debug for SelfSigned {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfSigned").finish_non_exhaustive()
    }
}

/// Generate a self-signed certificate for `names`. Development and tests only.
pub fn self_signed(names: &[&str]) -> Result<SelfSigned, ServerError> {
    let names: Vec<String> = names.iter().map(|n| (*n).to_owned()).collect();
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(names).map_err(|e| ServerError::Tls(e.to_string()))?;

    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));
    let certificate = cert.der().clone();
    let config = server_config(vec![certificate.clone()], key)?;

    Ok(SelfSigned { config, certificate, certificate_pem: cert.pem() })
}

fn server_config(
    certs: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
) -> Result<Arc<ServerConfig>, ServerError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ServerError::Tls(e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ServerError::Tls(e.to_string()))?;
    Ok(Arc::new(config))
}
