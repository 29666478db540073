//! Server configuration.

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};

/// Default per-connection read deadline.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-connection settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Deadline for the security handshake and for reading one full frame
    pub read_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { read_timeout: DEFAULT_READ_TIMEOUT }
    }
}

/// How the acceptor spawns connection tasks.
///
/// Handler logic is identical under both policies; only admission differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpawnPolicy {
    /// One task per accepted connection, no limit
    #[default]
    Unbounded,
    /// At most this many live connection tasks; the acceptor waits for a
    /// free slot before accepting the next connection
    Bounded(usize),
}

impl SpawnPolicy {
    /// `0` means unbounded.
    pub fn from_limit(max_connections: usize) -> Self {
        if max_connections == 0 { Self::Unbounded } else { Self::Bounded(max_connections) }
    }
}

/// Fieldwire telemetry collector.
#[derive(Debug, Parser)]
#[command(name = "fieldwire-server", version, about, long_about = None)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Server commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Accept device connections
    Serve(ServeArgs),

    /// Bind a device identity to its public key
    Register(RegisterArgs),
}

/// Arguments for `serve`.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "FIELDWIRE_LISTEN", default_value = "0.0.0.0:8888")]
    pub listen: SocketAddr,

    /// PEM certificate chain
    #[arg(long, env = "FIELDWIRE_TLS_CERT", required_unless_present = "self_signed")]
    pub tls_cert: Option<PathBuf>,

    /// PEM private key for the certificate
    #[arg(long, env = "FIELDWIRE_TLS_KEY", required_unless_present = "self_signed")]
    pub tls_key: Option<PathBuf>,

    /// Generate an ephemeral self-signed certificate (development only)
    #[arg(long, conflicts_with_all = ["tls_cert", "tls_key"])]
    pub self_signed: bool,

    /// Pre-shared AES-256 key, 64 hex characters
    #[arg(long, env = "FIELDWIRE_SHARED_SECRET", hide_env_values = true)]
    pub shared_secret: String,

    /// Key registry and telemetry database
    #[arg(long, env = "FIELDWIRE_DB", default_value = "fieldwire.redb")]
    pub db: PathBuf,

    /// Seconds allowed for the handshake and one full frame
    #[arg(
        long,
        default_value_t = DEFAULT_READ_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub read_timeout_secs: u64,

    /// Maximum concurrent connections (0 = unbounded)
    #[arg(long, default_value_t = 0)]
    pub max_connections: usize,
}

impl ServeArgs {
    /// Per-connection settings derived from the arguments.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig { read_timeout: Duration::from_secs(self.read_timeout_secs) }
    }

    /// Spawn policy derived from the arguments.
    pub fn spawn_policy(&self) -> SpawnPolicy {
        SpawnPolicy::from_limit(self.max_connections)
    }
}

/// Arguments for `register`.
#[derive(Debug, Args)]
pub struct RegisterArgs {
    /// Device identity (36 characters)
    #[arg(long)]
    pub identity: String,

    /// PEM public key file
    #[arg(long)]
    pub public_key: PathBuf,

    /// Key registry and telemetry database
    #[arg(long, env = "FIELDWIRE_DB", default_value = "fieldwire.redb")]
    pub db: PathBuf,
}
