//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the metrics exporter when enabled
//! - Build the connection handler and its shared dedup cache
//! - Bind the listener and accept until told to stop
//! - Give in-flight connections a bounded grace period on the way out

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ProxyConfig;
use crate::lifecycle::{signals, Shutdown};
use crate::net::{Listener, ListenerError};
use crate::observability::metrics;
use crate::proxy::{ConnectionHandler, DedupCache, Dialer, Relay, TcpDialer};

/// How long in-flight connections may run after the listener stops.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Serve until SIGINT/SIGTERM.
pub async fn serve(config: ProxyConfig) -> Result<(), ListenerError> {
    serve_until(config, signals::wait_for_shutdown()).await
}

/// Serve until `stop` resolves. Only a bind failure is an error.
pub async fn serve_until<F>(config: ProxyConfig, stop: F) -> Result<(), ListenerError>
where
    F: Future<Output = ()>,
{
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = Listener::bind(&config.listener).await?;
    let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;
    tracing::info!(address = %local_addr, "Server ready listen at port {}", local_addr.port());

    let handler = Arc::new(build_handler(&config));
    run(listener, handler, stop).await;
    Ok(())
}

/// Production handler: TCP dialing plus a fresh process-wide dedup cache.
pub fn build_handler(config: &ProxyConfig) -> ConnectionHandler<TcpDialer> {
    let relay = Relay::new(DedupCache::new(), config.relay.capture_payloads);
    ConnectionHandler::new(TcpDialer, relay)
}

/// Accept on `listener` until `stop` resolves, then drain.
pub async fn run<D, F>(listener: Listener, handler: Arc<ConnectionHandler<D>>, stop: F)
where
    D: Dialer,
    F: Future<Output = ()>,
{
    let shutdown = Shutdown::new();
    let tracker = listener.tracker();

    let accept = listener.serve(handler, shutdown.subscribe());
    tokio::pin!(accept);

    tokio::select! {
        _ = &mut accept => {}
        _ = stop => {
            shutdown.trigger();
            accept.await;
        }
    }

    if !tracker.wait_idle(SHUTDOWN_GRACE).await {
        tracing::warn!(
            active_connections = tracker.active_count(),
            "Grace period elapsed with connections still open"
        );
    }
}
