//! Per-connection state machine.
//!
//! ```text
//! Read ──empty/undecodable──▶ NoData
//!  │
//!  ▼
//! Classify ──no destination──▶ Error
//!  │
//!  ▼
//! Establish ──dial/handshake failure──▶ Error
//!  │
//!  ▼
//! Relay (both directions, both awaited) ──▶ Closed
//! ```
//!
//! The client stream is owned by the handler and dropped on every exit
//! path. The upstream stream is owned by the two relay directions once
//! relaying starts.

use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::Instrument;

use crate::error::ProxyError;
use crate::net::connection::{ConnectionId, ConnectionState};
use crate::observability::metrics;
use crate::proxy::dialer::Dialer;
use crate::proxy::relay::{Direction, Relay};
use crate::proxy::resolver::{self, Destination, Mode};

/// Upper bound of the single initial read used for classification.
pub const INITIAL_READ_SIZE: usize = 4096;

/// Reply sent to the client once a tunnel's upstream is connected.
pub const CONNECT_ESTABLISHED: &[u8] = b"HTTP/1.1 200 Connection Established\r\n\r\n";

/// Serves accepted client connections.
#[derive(Debug)]
pub struct ConnectionHandler<D> {
    dialer: D,
    relay: Relay,
}

impl<D: Dialer> ConnectionHandler<D> {
    pub fn new(dialer: D, relay: Relay) -> Self {
        Self { dialer, relay }
    }

    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    /// Drive one client connection to a terminal state.
    ///
    /// Never returns an error: every failure is logged here and reported
    /// as [`ConnectionState::Error`].
    pub async fn handle<S>(&self, client: S, peer: SocketAddr, id: ConnectionId) -> ConnectionState
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let span = tracing::info_span!("connection", connection_id = %id, peer_addr = %peer);
        let state = self.serve(client).instrument(span.clone()).await;
        span.in_scope(|| tracing::debug!(state = ?state, "Connection closed"));
        state
    }

    async fn serve<S>(&self, mut client: S) -> ConnectionState
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        tracing::info!("Got connection");

        let request = match read_initial(&mut client).await {
            Ok(Some(request)) => request,
            Ok(None) => return ConnectionState::NoData,
            Err(e) => {
                report(&e);
                return ConnectionState::Error;
            }
        };

        match self.proxy(client, request).await {
            Ok(()) => ConnectionState::Closed,
            Err(e) => {
                report(&e);
                ConnectionState::Error
            }
        }
    }

    async fn proxy<S>(&self, mut client: S, request: InitialRequest) -> Result<(), ProxyError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let destination = resolver::resolve(&request.text)?;
        tracing::debug!(destination = %destination, mode = ?destination.mode, "Request classified");

        let mut upstream = self.dialer.dial(&destination.host, destination.port).await?;
        establish(&destination, &request, &mut client, &mut upstream).await?;

        let (client_read, client_write) = tokio::io::split(client);
        let (upstream_read, upstream_write) = tokio::io::split(upstream);

        let (outbound, inbound) = tokio::join!(
            self.relay
                .run(Direction::ClientToUpstream, client_read, upstream_write),
            self.relay
                .run(Direction::UpstreamToClient, upstream_read, client_write),
        );

        match (outbound, inbound) {
            (Ok(sent), Ok(received)) => {
                tracing::debug!(sent, received, "Exchange complete");
                Ok(())
            }
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
            (Err(e), Err(other)) => {
                report(&other);
                Err(e)
            }
        }
    }
}

/// The first bytes a client sent, kept both raw and decoded.
#[derive(Debug)]
struct InitialRequest {
    raw: Vec<u8>,
    text: String,
}

/// Single bounded read. `None` means nothing usable arrived: either the
/// client sent nothing or the bytes were not valid UTF-8.
async fn read_initial<S>(client: &mut S) -> Result<Option<InitialRequest>, ProxyError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; INITIAL_READ_SIZE];
    let n = client.read(&mut buf).await?;
    buf.truncate(n);

    if buf.is_empty() {
        tracing::debug!("Client sent no data");
        return Ok(None);
    }

    match std::str::from_utf8(&buf) {
        Ok(text) => {
            let text = text.to_string();
            tracing::debug!(bytes = n, request = %text, "Initial request");
            Ok(Some(InitialRequest { raw: buf, text }))
        }
        Err(e) => {
            tracing::warn!(error = %ProxyError::Decode(e), "Discarding undecodable request");
            Ok(None)
        }
    }
}

/// Tunnel: answer the client. Forward: replay the request upstream.
async fn establish<C, U>(
    destination: &Destination,
    request: &InitialRequest,
    client: &mut C,
    upstream: &mut U,
) -> Result<(), ProxyError>
where
    C: AsyncWrite + Unpin,
    U: AsyncWrite + Unpin,
{
    match destination.mode {
        Mode::Tunnel => {
            client.write_all(CONNECT_ESTABLISHED).await?;
            client.flush().await?;
        }
        Mode::Forward => {
            upstream.write_all(&request.raw).await?;
            upstream.flush().await?;
        }
    }
    tracing::info!(destination = %destination, mode = ?destination.mode, "Upstream established");
    Ok(())
}

fn report(err: &ProxyError) {
    metrics::record_connection_error(err.kind());
    tracing::error!(kind = err.kind(), error = %err, "Connection failed");
}
