//! Upstream connection establishment.

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::ProxyError;

/// Opens the upstream side of a proxied connection.
///
/// One attempt per call; no retries and no timeout beyond what the OS
/// network stack imposes.
pub trait Dialer: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn dial(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<Self::Stream, ProxyError>> + Send;
}

/// Plain TCP dialer used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

impl Dialer for TcpDialer {
    type Stream = TcpStream;

    fn dial(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<TcpStream, ProxyError>> + Send {
        let host = host.to_string();
        async move {
            match TcpStream::connect((host.as_str(), port)).await {
                Ok(stream) => {
                    tracing::debug!(host = %host, port, "Upstream connected");
                    Ok(stream)
                }
                Err(source) => Err(ProxyError::UpstreamUnreachable { host, port, source }),
            }
        }
    }
}
