//! Fieldwire server binary.

use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use fieldwire_crypto::SharedSecret;
use fieldwire_proto::DeviceIdentity;
use fieldwire_server::{
    Acceptor, DispatchTable, RedbStore, ServerError, Session, TlsTransport,
    config::{Cli, Command, RegisterArgs, ServeArgs},
    load_server_config, self_signed,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Register(args) => register(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal");
            ExitCode::FAILURE
        },
    }
}

async fn serve(args: ServeArgs) -> Result<(), ServerError> {
    let secret = SharedSecret::from_hex(&args.shared_secret)?;

    let tls = match (&args.tls_cert, &args.tls_key) {
        _ if args.self_signed => {
            warn!("serving an ephemeral self-signed certificate");
            self_signed(&["localhost"])?.config
        },
        (Some(cert), Some(key)) => load_server_config(cert, key)?,
        _ => return Err(ServerError::Config("--tls-cert and --tls-key are required".into())),
    };

    let store = Arc::new(RedbStore::open(&args.db)?);
    info!(db = %args.db.display(), records = store.record_count()?, "store opened");

    let table = DispatchTable::standard(Arc::new(secret), store.clone(), store);
    let session = Session::new(table, args.session_config());

    let transport = TlsTransport::bind(args.listen, tls).await?;
    info!(addr = %transport.local_addr()?, policy = ?args.spawn_policy(), "listening");

    let acceptor = Acceptor::new(transport, session, args.spawn_policy());
    acceptor.run_until(shutdown_signal()).await?;

    info!(connections = acceptor.connection_count(), "server stopped");
    Ok(())
}

fn register(args: &RegisterArgs) -> Result<(), ServerError> {
    let identity = DeviceIdentity::parse(args.identity.trim())?;
    let pem = std::fs::read_to_string(&args.public_key)?;

    let store = RedbStore::open(&args.db)?;
    store.register_device(&identity, &pem)?;

    info!(%identity, db = %args.db.display(), "device registered");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for interrupt, running until killed");
        std::future::pending::<()>().await;
    }
    info!("interrupt received");
}
