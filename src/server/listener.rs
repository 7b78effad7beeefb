use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::http::connection::{CloseReason, Connection, ConnectionLimits};
use crate::http::date::DateCache;

/// Pause after a failed accept. Errors such as EMFILE persist until another
/// connection closes, so retrying immediately only spins.
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Source of inbound connections for [`serve`].
pub trait Accept {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn accept(&self) -> impl Future<Output = io::Result<(Self::Stream, SocketAddr)>> + Send;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl Accept for TcpListener {
    type Stream = TcpStream;

    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        let (socket, peer) = TcpListener::accept(self).await?;

        if let Err(e) = socket.set_nodelay(true) {
            debug!(peer = %peer, error = %e, "Failed to set TCP_NODELAY");
        }

        Ok((socket, peer))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }
}

pub async fn run(
    cfg: &Config,
    dates: Arc<DateCache>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.listen_addr))?;

    serve(
        listener,
        cfg.connection_limits(),
        cfg.shutdown_grace(),
        dates,
        shutdown,
    )
    .await
}

/// Accepts connections until `shutdown` flips, then waits up to `grace` for
/// open connections to finish before aborting them.
pub async fn serve<L: Accept>(
    listener: L,
    limits: ConnectionLimits,
    grace: Duration,
    dates: Arc<DateCache>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    info!("Server listening on http://{}", listener.local_addr()?);

    let mut connections = JoinSet::new();

    while !*shutdown.borrow_and_update() {
        tokio::select! {
            _ = shutdown.changed() => break,

            Some(finished) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = finished {
                    report_task_failure(e);
                }
            }

            accepted = listener.accept() => {
                let (socket, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        tokio::select! {
                            _ = shutdown.changed() => break,
                            _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => continue,
                        }
                    }
                };
                debug!("Accepted connection from {}", peer);

                let mut conn = Connection::new(socket, Arc::clone(&dates), shutdown.clone(), limits);
                connections.spawn(async move {
                    match conn.run().await {
                        Ok(summary) => match summary.close {
                            CloseReason::Malformed(e) => {
                                debug!(peer = %peer, requests = summary.requests, error = %e, "Closing connection on bad request");
                            }
                            CloseReason::PrematureEndOfStream => {
                                debug!(peer = %peer, requests = summary.requests, "Connection closed mid-request");
                            }
                            close => {
                                debug!(peer = %peer, requests = summary.requests, reason = ?close, "Connection closed");
                            }
                        },
                        Err(e) => warn!("Connection error from {}: {}", peer, e),
                    }
                });
            }
        }
    }

    drop(listener);
    info!(active = connections.len(), "Shutting down, draining connections");

    let drained = tokio::time::timeout(grace, async {
        while let Some(finished) = connections.join_next().await {
            if let Err(e) = finished {
                report_task_failure(e);
            }
        }
    })
    .await;

    if drained.is_err() {
        warn!(remaining = connections.len(), "Grace period elapsed, aborting connections");
        connections.shutdown().await;
    }

    Ok(())
}

fn report_task_failure(e: JoinError) {
    if e.is_panic() {
        warn!(error = %e, "Connection task panicked");
    } else {
        debug!(error = %e, "Connection task cancelled");
    }
}
