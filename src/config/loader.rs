//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Why a config file could not be turned into a [`ProxyConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {}", list(.0))]
    Invalid(Vec<ValidationError>),
}

fn list(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    let config: ProxyConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Invalid)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_file_from_disk() {
        let path = std::env::temp_dir().join(format!(
            "tunnel-proxy-loader-{}.toml",
            std::process::id()
        ));
        fs::write(
            &path,
            "[listener]\nport = 4000\n\n[observability]\nlog_level = \"debug\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(config.listener.port, 4000);
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().starts_with("cannot read /definitely/not/here.toml"));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let err = parse_config("[listener]\nport = 0\nhost = \"\"\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: listener.host must not be empty; listener.port must be non-zero"
        );
        match err {
            ConfigError::Invalid(errors) => assert_eq!(
                errors,
                vec![ValidationError::EmptyHost, ValidationError::ZeroPort]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_syntax_is_parse_error() {
        let err = parse_config("[listener\nport = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
