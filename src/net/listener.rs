//! TCP listener and accept loop.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections, one task each, no upper bound
//! - Keep accepting through per-connection and accept errors

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::ListenerConfig;
use crate::net::connection::ConnectionTracker;
use crate::proxy::{ConnectionHandler, Dialer};

/// Pause after a failed accept so fd exhaustion does not spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {}

/// Accepts clients and hands each to the connection handler.
pub struct Listener {
    inner: TcpListener,
    tracker: ConnectionTracker,
}

impl Listener {
    /// Bind to the configured address.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind(config.bind_address())
            .await
            .map_err(ListenerError::Bind)?;
        Ok(Self::from_tcp(listener))
    }

    /// Wrap an already-bound socket.
    pub fn from_tcp(inner: TcpListener) -> Self {
        Self {
            inner,
            tracker: ConnectionTracker::new(),
        }
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Live connection tracker, shared with every spawned handler.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Accept until `shutdown` fires (or its sender is dropped).
    ///
    /// In-flight connections keep running after this returns.
    pub async fn serve<D: Dialer>(
        &self,
        handler: Arc<ConnectionHandler<D>>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!(
                        active_connections = self.tracker.active_count(),
                        "Listener stopped accepting"
                    );
                    return;
                }
                accepted = self.inner.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let guard = self.tracker.track();
                        let handler = Arc::clone(&handler);
                        tokio::spawn(async move {
                            handler.handle(stream, peer, guard.id()).await;
                            drop(guard);
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }
    }
}
