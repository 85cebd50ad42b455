//! Error taxonomy for connection handling.
//!
//! Every variant is caught at the connection handler boundary; none of
//! them reach the listener.

use std::io;
use thiserror::Error;

/// Errors raised while serving one client connection.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Initial bytes were not valid UTF-8.
    #[error("initial request is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),

    /// CONNECT line without a usable `host:port` target.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Plain request with no `Host:` line.
    #[error("no Host header in forward request")]
    MissingHostHeader,

    /// Dialing the destination failed (DNS, refused, network).
    #[error("upstream {host}:{port} unreachable: {source}")]
    UpstreamUnreachable {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// A peer reset the connection mid-exchange.
    #[error("connection reset: {0}")]
    ConnectionReset(#[source] io::Error),

    /// Anything else that went wrong on the wire.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl ProxyError {
    /// Classify a raw I/O error into the reset bucket or the catch-all.
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => ProxyError::ConnectionReset(err),
            _ => ProxyError::Io(err),
        }
    }

    /// Short label used for the error metric.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Decode(_) => "decode",
            ProxyError::MalformedRequest(_) => "malformed_request",
            ProxyError::MissingHostHeader => "missing_host_header",
            ProxyError::UpstreamUnreachable { .. } => "upstream_unreachable",
            ProxyError::ConnectionReset(_) => "connection_reset",
            ProxyError::Io(_) => "unknown",
        }
    }
}

impl From<io::Error> for ProxyError {
    fn from(err: io::Error) -> Self {
        ProxyError::from_io(err)
    }
}
