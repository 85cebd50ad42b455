//! Destination extraction from the initial request text.
//!
//! # Responsibilities
//! - Tell tunnel (`CONNECT`) requests apart from plain forward requests
//! - Pull `host:port` out of the CONNECT request line
//! - Pull the host (and optional port) out of the `Host:` header
//!
//! # Design Decisions
//! - Only the first line and the `Host` header are looked at
//! - Header name match is case-sensitive
//! - Anything that is not CONNECT is forwarded as plain HTTP

use crate::error::ProxyError;

/// Port used when a forward request names no explicit port.
pub const DEFAULT_HTTP_PORT: u16 = 80;

const HOST_HEADER: &str = "Host:";

/// How the upstream connection is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Reply `200 Connection Established`, then relay opaque bytes.
    Tunnel,
    /// Send the original request bytes upstream, then relay.
    Forward,
}

/// Where to dial, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub host: String,
    pub port: u16,
    pub mode: Mode,
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Classify the request and extract its destination.
pub fn resolve(request: &str) -> Result<Destination, ProxyError> {
    let first_line = request.lines().next().unwrap_or_default();
    if first_line.starts_with("CONNECT") {
        resolve_tunnel(first_line)
    } else {
        resolve_forward(request)
    }
}

fn resolve_tunnel(line: &str) -> Result<Destination, ProxyError> {
    let target = line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| ProxyError::MalformedRequest(format!("no target in '{}'", line)))?;

    match split_host_port(target, Mode::Tunnel)? {
        (host, Some(port)) => Ok(Destination {
            host,
            port,
            mode: Mode::Tunnel,
        }),
        (_, None) => Err(ProxyError::MalformedRequest(format!(
            "no port in CONNECT target '{}'",
            target
        ))),
    }
}

fn resolve_forward(request: &str) -> Result<Destination, ProxyError> {
    let value = request
        .lines()
        .filter_map(|line| line.strip_prefix(HOST_HEADER))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .ok_or(ProxyError::MissingHostHeader)?;

    let (host, port) = split_host_port(value, Mode::Forward)?;
    Ok(Destination {
        host,
        port: port.unwrap_or(DEFAULT_HTTP_PORT),
        mode: Mode::Forward,
    })
}

/// Split `host[:port]` on the last `:`. Bracketed IPv6 literals lose
/// their brackets. In a `Host:` value an unbracketed IPv6 literal is all
/// host; a CONNECT target always ends in `:port`.
fn split_host_port(authority: &str, mode: Mode) -> Result<(String, Option<u16>), ProxyError> {
    let malformed = || ProxyError::MalformedRequest(format!("bad authority '{}'", authority));

    let (host, port) = if let Some(rest) = authority.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(malformed)?;
        match tail {
            "" => (host, None),
            _ => (host, Some(tail.strip_prefix(':').ok_or_else(malformed)?)),
        }
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) if mode == Mode::Tunnel || !host.contains(':') => {
                (host, Some(port))
            }
            _ => (authority, None),
        }
    };

    if host.is_empty() {
        return Err(malformed());
    }
    let port = match port {
        Some(port) => Some(port.parse::<u16>().map_err(|_| malformed())?),
        None => None,
    };
    Ok((host.to_string(), port))
}
