//! TCP listener lifecycle
//!
//! A [`ServerHandle`] owns the bound socket. Serving runs until the shutdown
//! signal flips to draining, after which the listener is closed and
//! in-flight connections get up to the drain timeout to finish.

use super::shutdown::ShutdownSignal;
use axum::Router;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server failed: {0}")]
    Serve(#[from] std::io::Error),
}

/// How the drain ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every in-flight request finished
    Completed,
    /// The drain timeout elapsed with connections still open
    TimedOut,
}

/// Bound listener, ready to serve
pub struct ServerHandle {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl ServerHandle {
    /// Bind on all interfaces at `port`
    ///
    /// Port 0 picks an ephemeral port; see [`ServerHandle::local_addr`].
    pub async fn bind(port: u16) -> Result<Self, ServerError> {
        Self::bind_addr(SocketAddr::from(([0, 0, 0, 0], port))).await
    }

    pub async fn bind_addr(addr: SocketAddr) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        // Log after successful bind - server is actually listening
        info!(addr = %local_addr, "App running on port {}", local_addr.port());

        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve `app` until `shutdown` starts draining, then drain
    ///
    /// Returns once all connections have closed or `drain_timeout` has
    /// elapsed, whichever comes first. Connections still open on timeout
    /// are left to be closed when the process exits.
    pub async fn serve(
        self,
        app: Router,
        shutdown: ShutdownSignal,
        drain_timeout: Duration,
    ) -> Result<DrainOutcome, ServerError> {
        let mut graceful = shutdown.clone();
        let server = axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                graceful.wait().await;
                info!("Draining: no longer accepting connections");
            })
            .into_future();
        tokio::pin!(server);

        let mut draining = shutdown;
        tokio::select! {
            result = &mut server => {
                // Only reachable on an accept loop failure; a clean exit
                // requires the shutdown signal.
                result?;
                return Ok(DrainOutcome::Completed);
            }
            _ = draining.wait() => {}
        }

        match tokio::time::timeout(drain_timeout, server).await {
            Ok(result) => {
                result?;
                info!("HTTP server closed");
                Ok(DrainOutcome::Completed)
            }
            Err(_) => {
                warn!(
                    timeout_secs = drain_timeout.as_secs_f64(),
                    "Drain timeout reached with connections still open"
                );
                Ok(DrainOutcome::TimedOut)
            }
        }
    }
}
