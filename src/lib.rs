//! Transparent forwarding proxy for plain HTTP and CONNECT tunnels.
//!
//! # Architecture Overview
//!
//! ```text
//!   client ──▶ net::Listener ──▶ proxy::ConnectionHandler ──▶ proxy::Dialer ──▶ upstream
//!                                       │
//!                                       ├── resolver: CONNECT host:port | Host: header
//!                                       └── relay ×2 ◀──▶ dedup cache (debug payload logs)
//!
//!   config ── lifecycle (startup, signals, shutdown) ── observability (logs, metrics)
//! ```

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod proxy;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use lifecycle::{serve, Shutdown};
