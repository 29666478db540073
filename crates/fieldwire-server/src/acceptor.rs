//! Connection acceptor.
//!
//! Accepts connections from a [`Transport`] and runs each one in its own
//! task: security handshake, then one [`Session`]. The accept loop never
//! waits on a handshake or a session, so a slow peer cannot stall other
//! devices.

use std::{
    future::Future,
    io,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use fieldwire_core::Transport;
use tokio::{
    sync::Semaphore,
    task::{JoinError, JoinSet},
};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::{SessionError, config::SpawnPolicy, session::Session};

/// Pause after a failed accept before trying again, so fd exhaustion does
/// not turn into a busy loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accept loop over a transport.
pub struct Acceptor<T: Transport> {
    transport: Arc<T>,
    session: Session,
    policy: SpawnPolicy,
    accepted: Arc<AtomicU64>,
    failed: AtomicU64,
}

impl<T: Transport> Acceptor<T> {
    /// Create an acceptor.
    pub fn new(transport: T, session: Session, policy: SpawnPolicy) -> Self {
        Self {
            transport: Arc::new(transport),
            session,
            policy,
            accepted: Arc::new(AtomicU64::new(0)),
            failed: AtomicU64::new(0),
        }
    }

    /// Total connections accepted so far.
    pub fn connection_count(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Connection tasks that panicked or were cancelled.
    pub fn failed_task_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Accept connections until `shutdown` resolves, then wait for in-flight
    /// connections to finish.
    ///
    /// Every connection is bounded by the session read deadline, so draining
    /// terminates.
    pub async fn run_until<F>(&self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let slots = match self.policy {
            SpawnPolicy::Unbounded => None,
            SpawnPolicy::Bounded(limit) => Some(Arc::new(Semaphore::new(limit))),
        };
        let mut tasks = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            let permit = match &slots {
                None => None,
                Some(slots) => tokio::select! {
                    () = &mut shutdown => break,
                    permit = Arc::clone(slots).acquire_owned() => match permit {
                        Ok(permit) => Some(permit),
                        Err(_) => break,
                    },
                },
            };

            let accepted = tokio::select! {
                () = &mut shutdown => break,
                accepted = self.transport.accept() => accepted,
            };

            let (incoming, peer) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                },
            };

            let id = self.accepted.fetch_add(1, Ordering::Relaxed) + 1;
            let transport = Arc::clone(&self.transport);
            let session = self.session.clone();
            let span = info_span!("connection", id, %peer);

            tasks.spawn(
                async move {
                    let _permit = permit;
                    serve_connection(&*transport, &session, incoming).await;
                }
                .instrument(span),
            );

            while let Some(joined) = tasks.try_join_next() {
                self.reap(joined);
            }
        }

        info!(in_flight = tasks.len(), "acceptor stopping, draining connections");
        while let Some(joined) = tasks.join_next().await {
            self.reap(joined);
        }

        Ok(())
    }

    fn reap(&self, joined: Result<(), JoinError>) {
        if let Err(e) = joined {
            self.failed.fetch_add(1, Ordering::Relaxed);
            error!(error = %e, "connection task failed");
        }
    }
}

impl<T: Transport> std::fmt::Debug for Acceptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Acceptor")
            .field("policy", &self.policy)
            .field("accepted", &self.connection_count())
            .field("failed", &self.failed_task_count())
            .finish_non_exhaustive()
    }
}

async fn serve_connection<T: Transport>(transport: &T, session: &Session, incoming: T::Incoming) {
    let deadline = session.config().read_timeout;

    let result = async {
        let mut stream = tokio::time::timeout(deadline, transport.secure(incoming))
            .await
            .map_err(|_| SessionError::ReadTimeout(deadline))?
            .map_err(SessionError::Handshake)?;
        debug!("connection secured");
        session.run(&mut stream).await
    }
    .await;

    match result {
        Ok(outcome) => info!(?outcome, "frame acknowledged"),
        Err(e) if e.is_internal() => error!(stage = %e.stage(), error = %e, "connection failed"),
        Err(e) => warn!(stage = %e.stage(), error = %e, "connection rejected"),
    }
}
