//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use tunnel_proxy::net::Listener;
use tunnel_proxy::proxy::{ConnectionHandler, DedupCache, Dialer, Relay, TcpDialer};
use tunnel_proxy::{ProxyError, Shutdown};

/// Start an upstream that echoes every byte back until the peer closes.
pub async fn start_echo_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut read, mut write) = socket.split();
                let _ = tokio::io::copy(&mut read, &mut write).await;
            });
        }
    });

    addr
}

/// Start an upstream that reads one request head, records it, answers
/// with `response` and closes.
pub async fn start_http_upstream(response: &'static str) -> (SocketAddr, Arc<Mutex<Vec<Vec<u8>>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = seen.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let record = record.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                record.lock().unwrap().push(request);
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, seen)
}

/// An address nothing is listening on.
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Dials `target` whatever host and port the request named, and records
/// what was asked for.
#[derive(Clone)]
pub struct RedirectDialer {
    pub target: SocketAddr,
    pub calls: Arc<Mutex<Vec<(String, u16)>>>,
}

impl RedirectDialer {
    pub fn new(target: SocketAddr) -> Self {
        Self {
            target,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<(String, u16)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Dialer for RedirectDialer {
    type Stream = TcpStream;

    fn dial(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<TcpStream, ProxyError>> + Send {
        self.calls.lock().unwrap().push((host.to_string(), port));
        let target = self.target;
        let host = host.to_string();
        async move {
            TcpStream::connect(target)
                .await
                .map_err(|source| ProxyError::UpstreamUnreachable { host, port, source })
        }
    }
}

/// A running proxy. Dropping it stops the accept loop.
pub struct ProxyUnderTest {
    pub addr: SocketAddr,
    pub cache: DedupCache,
    _shutdown: Shutdown,
}

/// Start a proxy on an ephemeral port with the given dialer.
pub async fn start_proxy<D: Dialer>(dialer: D) -> ProxyUnderTest {
    let cache = DedupCache::new();
    let handler = Arc::new(ConnectionHandler::new(dialer, Relay::new(cache.clone(), true)));

    let listener = Listener::from_tcp(TcpListener::bind("127.0.0.1:0").await.unwrap());
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        listener.serve(handler, rx).await;
    });

    ProxyUnderTest {
        addr,
        cache,
        _shutdown: shutdown,
    }
}

/// Start a proxy that dials for real.
pub async fn start_tcp_proxy() -> ProxyUnderTest {
    start_proxy(TcpDialer).await
}
