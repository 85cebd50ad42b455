//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Resolve the effective level from `RUST_LOG`, `--verbose` and config
//!
//! # Levels
//! - info: startup, shutdown, peer connects
//! - debug: raw request text and relayed payloads
//! - warn: undecodable requests
//! - error: resets and unexpected connection failures

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crate-scoped filter directive for the given settings.
pub fn directive(level: &str, verbose: bool) -> String {
    let level = if verbose { "debug" } else { level };
    format!("tunnel_proxy={}", level.to_lowercase())
}

/// Install the global subscriber. `RUST_LOG`, when set, wins.
///
/// Calling this twice is harmless; the second call is ignored.
pub fn init(level: &str, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive(level, verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_forces_debug() {
        assert_eq!(directive("warn", true), "tunnel_proxy=debug");
        assert_eq!(directive("INFO", false), "tunnel_proxy=info");
    }

    #[test]
    fn directive_parses_as_filter() {
        assert!(EnvFilter::try_new(directive("trace", false)).is_ok());
    }
}
