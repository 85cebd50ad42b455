use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use tunnel_proxy::config::{self, ProxyConfig};
use tunnel_proxy::lifecycle;
use tunnel_proxy::net::ListenerError;
use tunnel_proxy::observability::logging;

/// Forwarding proxy for plain HTTP and CONNECT tunnels.
#[derive(Parser)]
#[command(name = "tunnel-proxy", version, about, long_about = None)]
struct Cli {
    /// Port to listen on [default: 9876]
    #[arg(short, long)]
    port: Option<u16>,

    /// Log at debug level, including raw requests and relayed payloads
    #[arg(short, long)]
    verbose: bool,

    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match config::load_config(path) {
            Ok(config) => config,
            Err(e) => {
                logging::init("info", cli.verbose);
                tracing::error!(path = %path.display(), error = %e, "Failed to load configuration");
                return ExitCode::FAILURE;
            }
        },
        None => ProxyConfig::default(),
    };
    let config = apply_overrides(config, &cli);

    logging::init(&config.observability.log_level, cli.verbose);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address(),
        "tunnel-proxy starting"
    );

    let result = lifecycle::serve(config).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Server failed to start");
    }

    tracing::info!("Server closed");
    ExitCode::from(exit_status(&result))
}

/// Interrupt exits non-zero; a failed start is logged and exits cleanly.
fn exit_status(result: &Result<(), ListenerError>) -> u8 {
    match result {
        Ok(()) => 1,
        Err(_) => 0,
    }
}

fn apply_overrides(mut config: ProxyConfig, cli: &Cli) -> ProxyConfig {
    if let Some(port) = cli.port {
        config.listener.port = port;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_flag_overrides_config() {
        let cli = Cli::try_parse_from(["tunnel-proxy", "--port", "8080"]).unwrap();
        let config = apply_overrides(ProxyConfig::default(), &cli);
        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.listener.host, "0.0.0.0");
    }

    #[test]
    fn verbose_flag_leaves_config_untouched() {
        let cli = Cli::try_parse_from(["tunnel-proxy", "-v"]).unwrap();
        let mut base = ProxyConfig::default();
        base.listener.port = 4000;
        base.observability.log_level = "warn".into();

        let config = apply_overrides(base, &cli);
        assert_eq!(config.listener.port, 4000);
        assert_eq!(config.observability.log_level, "warn");
        assert!(cli.verbose);
    }

    #[test]
    fn interrupt_exits_non_zero_and_bind_failure_exits_cleanly() {
        assert_eq!(exit_status(&Ok(())), 1);
        let bind = ListenerError::Bind(std::io::Error::from(std::io::ErrorKind::AddrInUse));
        assert_eq!(exit_status(&Err(bind)), 0);
    }
}
