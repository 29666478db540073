//! Fieldwire client binary.

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Args, Parser, Subcommand};
use fieldwire_client::{ComposeError, Composer, TlsDialer, submit};
use fieldwire_crypto::{DevicePrivateKey, SharedSecret};
use fieldwire_proto::DeviceIdentity;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Fieldwire device client.
#[derive(Debug, Parser)]
#[command(name = "fieldwire-client", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Seal one telemetry report and submit it
    Send(SendArgs),

    /// Generate a device key pair
    Keygen(KeygenArgs),
}

#[derive(Debug, Args)]
struct SendArgs {
    /// Collector address
    #[arg(long, env = "FIELDWIRE_SERVER")]
    server: SocketAddr,

    /// Name on the collector's certificate
    #[arg(long, default_value = "localhost")]
    server_name: String,

    /// PEM certificate(s) to trust for the collector
    #[arg(long, env = "FIELDWIRE_CA_CERT")]
    ca_cert: PathBuf,

    /// File holding this device's 36-character identity
    #[arg(long, env = "FIELDWIRE_IDENTITY_FILE")]
    identity_file: PathBuf,

    /// PEM private key (PKCS#8 or PKCS#1)
    #[arg(long, env = "FIELDWIRE_PRIVATE_KEY")]
    private_key: PathBuf,

    /// Pre-shared AES-256 key, 64 hex characters
    #[arg(long, env = "FIELDWIRE_SHARED_SECRET", hide_env_values = true)]
    shared_secret: String,

    /// Hardware identifier, six colon-separated hex pairs
    #[arg(long)]
    hardware_id: String,

    /// 40-character installation identifier
    #[arg(long)]
    installation_id: String,

    /// Device-reported time, seconds since the Unix epoch
    #[arg(long, default_value_t = 0)]
    device_time: i64,
}

#[derive(Debug, Args)]
struct KeygenArgs {
    /// Where to write the PKCS#8 private key
    #[arg(long, default_value = "device.key.pem")]
    private_key: PathBuf,

    /// Where to write the public key for registration
    #[arg(long, default_value = "device.pub.pem")]
    public_key: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let result = match Cli::parse().command {
        Command::Send(args) => send(args).await,
        Command::Keygen(args) => keygen(&args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "failed");
            ExitCode::FAILURE
        },
    }
}

async fn send(args: SendArgs) -> Result<(), ComposeError> {
    let identity = tokio::fs::read_to_string(&args.identity_file).await?;
    let identity = DeviceIdentity::parse(identity.trim())?;
    let signing_key = DevicePrivateKey::from_pem(&tokio::fs::read_to_string(&args.private_key).await?)?;
    let secret = SharedSecret::from_hex(&args.shared_secret)?;

    let composer = Composer::new(identity, signing_key, secret);
    let frame = composer.compose(&args.hardware_id, &args.installation_id, args.device_time)?;

    let dialer = TlsDialer::with_ca_file(&args.ca_cert, &args.server_name)?;
    let mut stream = dialer.connect(args.server).await?;
    submit(&mut stream, &frame).await?;

    info!(identity = %composer.identity(), server = %args.server, "telemetry acknowledged");
    Ok(())
}

async fn keygen(args: &KeygenArgs) -> Result<(), ComposeError> {
    let key = tokio::task::spawn_blocking(DevicePrivateKey::generate)
        .await
        .map_err(|e| ComposeError::Io(std::io::Error::other(e)))??;

    write_pem(&args.private_key, key.to_pem()?.as_bytes()).await?;
    write_pem(&args.public_key, key.public_key().to_pem()?.as_bytes()).await?;

    info!(
        private_key = %args.private_key.display(),
        public_key = %args.public_key.display(),
        "key pair written"
    );
    Ok(())
}

async fn write_pem(path: &Path, pem: &[u8]) -> Result<(), ComposeError> {
    tokio::fs::write(path, pem).await?;
    Ok(())
}
