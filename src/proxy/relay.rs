//! One-way byte relay between two connections.
//!
//! A proxied connection runs two of these concurrently, one per
//! direction. Each copies until its source reaches end-of-stream or an
//! error occurs, then closes its destination. The source is never closed
//! here; it is the destination of the paired direction.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::Level;

use crate::error::ProxyError;
use crate::observability::metrics;
use crate::proxy::dedup::DedupCache;

/// Bytes requested per read.
pub const RELAY_CHUNK_SIZE: usize = 4096;

/// Which way bytes flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToUpstream,
    UpstreamToClient,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::ClientToUpstream => "client_to_upstream",
            Direction::UpstreamToClient => "upstream_to_client",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether relayed payload text would reach the log.
fn payload_logging_enabled() -> bool {
    tracing::enabled!(Level::DEBUG)
}

/// Copies bytes in one direction, feeding the dedup cache as it goes.
#[derive(Debug, Clone)]
pub struct Relay {
    cache: DedupCache,
    capture_payloads: bool,
}

impl Relay {
    pub fn new(cache: DedupCache, capture_payloads: bool) -> Self {
        Self {
            cache,
            capture_payloads,
        }
    }

    pub fn cache(&self) -> &DedupCache {
        &self.cache
    }

    /// Copy `source` into `destination` until end-of-stream, then close
    /// `destination`. The close runs on the error path too.
    ///
    /// Returns the number of bytes copied.
    pub async fn run<R, W>(
        &self,
        direction: Direction,
        mut source: R,
        mut destination: W,
    ) -> Result<u64, ProxyError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let result = self.pump(direction, &mut source, &mut destination).await;

        if let Err(e) = destination.shutdown().await {
            tracing::trace!(direction = %direction, error = %e, "Destination already closed");
        }

        match &result {
            Ok(bytes) => tracing::debug!(direction = %direction, bytes, "Relay finished"),
            Err(e) => tracing::debug!(direction = %direction, error = %e, "Relay failed"),
        }
        result
    }

    async fn pump<R, W>(
        &self,
        direction: Direction,
        source: &mut R,
        destination: &mut W,
    ) -> Result<u64, ProxyError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = vec![0u8; RELAY_CHUNK_SIZE];
        let mut message = Vec::new();
        let mut total = 0u64;

        loop {
            let n = source.read(&mut buf).await?;
            if n == 0 {
                break;
            }

            destination.write_all(&buf[..n]).await?;
            destination.flush().await?;
            total += n as u64;
            metrics::record_relayed_bytes(direction, n);

            if self.capture_payloads {
                message.extend_from_slice(&buf[..n]);
                self.observe(direction, &message);
            }
        }

        Ok(total)
    }

    /// Log the accumulated message unless its digest was already seen.
    fn observe(&self, direction: Direction, message: &[u8]) {
        let digest = DedupCache::digest(message);
        if !self.cache.contains(&digest) && payload_logging_enabled() {
            tracing::debug!(
                direction = %direction,
                bytes = message.len(),
                payload = %String::from_utf8_lossy(message),
                "Relayed payload"
            );
        }
        self.cache.insert(digest);
    }
}
