use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::resolver::ResolverConfig;
use super::server::ServerConfig;

/// Main configuration structure for Delver DNS
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Listener configuration (bind address, port, worker bounds)
    #[serde(default)]
    pub server: ServerConfig,

    /// Recursive resolution configuration
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. delver-dns.toml in current directory
    /// 3. /etc/delver-dns/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if std::path::Path::new("delver-dns.toml").exists() {
            Self::from_file("delver-dns.toml")?
        } else if std::path::Path::new("/etc/delver-dns/config.toml").exists() {
            Self::from_file("/etc/delver-dns/config.toml")?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(bind) = overrides.bind_address {
            self.server.bind_address = bind;
        }
        if let Some(root) = overrides.root_server {
            self.resolver.root_server = root;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "listen port cannot be 0".to_string(),
            ));
        }

        if self.resolver.root_server.parse::<Ipv4Addr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "root_server '{}' is not an IPv4 address",
                self.resolver.root_server
            )));
        }

        if self.resolver.max_depth == 0 {
            return Err(ConfigError::Validation(
                "resolver max_depth must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub root_server: Option<String>,
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 53);
        assert_eq!(config.server.query_timeout_ms, 3000);
        assert_eq!(config.resolver.root_server, "198.41.0.4");
        assert_eq!(config.resolver.upstream_port, 53);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 5353

            [resolver]
            root_server = "199.9.14.201"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 5353);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.resolver.root_server, "199.9.14.201");
        assert_eq!(config.resolver.max_depth, 16);
    }

    #[test]
    fn cli_overrides_take_precedence() {
        let mut config = Config::default();
        config.apply_cli_overrides(CliOverrides {
            port: Some(1053),
            bind_address: Some("127.0.0.1".to_string()),
            root_server: Some("192.33.4.12".to_string()),
            log_level: Some("debug".to_string()),
        });

        assert_eq!(config.server.port, 1053);
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.resolver.root_server, "192.33.4.12");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn validation_rejects_bad_root_server() {
        let mut config = Config::default();
        config.resolver.root_server = "not-an-ip".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn validation_rejects_zero_depth() {
        let mut config = Config::default();
        config.resolver.max_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 9953").unwrap();

        let config = Config::load(
            Some(file.path().to_str().unwrap()),
            CliOverrides::default(),
        )
        .unwrap();
        assert_eq!(config.server.port, 9953);
    }
}
