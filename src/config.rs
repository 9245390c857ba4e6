//! Bridge configuration module
//! Handles the listener address, endpoint paths and command timeout

use crate::constants::{
    DEFAULT_COMMAND_TIMEOUT, DEFAULT_HOST, DEFAULT_PORT, OBSERVER_WS_PATH, PEER_WS_PATH,
};
use crate::error::{BridgeError, Result};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Bridge configuration parameters
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub host: String,
    pub port: u16,
    /// Maximum time a command waits for its reply
    pub command_timeout: Duration,
    /// Path segment for passive observer sockets
    pub observer_path: String,
    /// Path segment for the game server socket
    pub peer_path: String,
}

impl BridgeConfig {
    /// Create a test configuration
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            command_timeout: Duration::from_millis(200),
            observer_path: OBSERVER_WS_PATH.to_string(),
            peer_path: PEER_WS_PATH.to_string(),
        }
    }

    /// Split a `WS_ADDR` style value (`:8080`, `127.0.0.1:9000`) into host and port
    fn parse_listen_addr(value: &str) -> Result<(String, u16)> {
        let (host, port) = value.rsplit_once(':').ok_or_else(|| {
            BridgeError::ConfigError(format!("WS_ADDR must look like host:port, got '{}'", value))
        })?;

        let port = port.parse::<u16>().map_err(|e| {
            BridgeError::ConfigError(format!("Invalid port in WS_ADDR '{}': {}", value, e))
        })?;

        let host = if host.is_empty() {
            DEFAULT_HOST.to_string()
        } else {
            host.to_string()
        };

        Ok((host, port))
    }

    fn validate_path(path: &str, name: &str) -> Result<()> {
        if path.is_empty() || path.contains('/') {
            return Err(BridgeError::ConfigError(format!(
                "{} must be a single non-empty path segment, got '{}'",
                name, path
            )));
        }
        Ok(())
    }

    /// Check the values that cannot be expressed through types alone
    pub fn validate(&self) -> Result<()> {
        if self.command_timeout.is_zero() {
            return Err(BridgeError::ConfigError(
                "Command timeout must be greater than zero".to_string(),
            ));
        }

        Self::validate_path(&self.observer_path, "Observer path")?;
        Self::validate_path(&self.peer_path, "Peer path")?;

        if self.observer_path == self.peer_path {
            return Err(BridgeError::ConfigError(format!(
                "Observer and peer endpoints must differ, both are '{}'",
                self.peer_path
            )));
        }

        Ok(())
    }

    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        let mut host = env::var("ROTARIA_HOST").unwrap_or(DEFAULT_HOST.to_string());
        let mut port = match env::var("ROTARIA_PORT") {
            Ok(value) => value.trim().parse::<u16>().map_err(|e| {
                BridgeError::ConfigError(format!("Invalid ROTARIA_PORT '{}': {}", value, e))
            })?,
            Err(_) => DEFAULT_PORT,
        };

        // WS_ADDR wins over host/port
        if let Ok(addr) = env::var("WS_ADDR") {
            if !addr.trim().is_empty() {
                (host, port) = Self::parse_listen_addr(addr.trim())?;
            }
        }

        let timeout_secs = match env::var("ROTARIA_COMMAND_TIMEOUT_SECS") {
            Ok(value) => value.parse::<u64>().map_err(|e| {
                BridgeError::ConfigError(format!(
                    "Invalid ROTARIA_COMMAND_TIMEOUT_SECS '{}': {}",
                    value, e
                ))
            })?,
            Err(_) => DEFAULT_COMMAND_TIMEOUT.as_secs(),
        };

        let observer_path =
            env::var("ROTARIA_OBSERVER_PATH").unwrap_or(OBSERVER_WS_PATH.to_string());
        let peer_path = env::var("ROTARIA_PEER_PATH").unwrap_or(PEER_WS_PATH.to_string());

        let config = Self {
            host,
            port,
            command_timeout: Duration::from_secs(timeout_secs),
            observer_path,
            peer_path,
        };
        config.validate()?;

        Ok(config)
    }

    /// Resolve the listener address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| {
                BridgeError::ConfigError(format!(
                    "Failed to parse server address {}:{}: {}",
                    self.host, self.port, e
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_testing_is_valid() {
        let config = BridgeConfig::for_testing();
        assert!(config.validate().is_ok());
        assert_eq!(config.socket_addr().unwrap().port(), 0);
    }

    #[test]
    fn test_parse_listen_addr_without_host() {
        let (host, port) = BridgeConfig::parse_listen_addr(":8080").unwrap();
        assert_eq!(host, DEFAULT_HOST);
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_parse_listen_addr_with_host() {
        let (host, port) = BridgeConfig::parse_listen_addr("127.0.0.1:9000").unwrap();
        assert_eq!(host, "127.0.0.1");
        assert_eq!(port, 9000);
    }

    #[test]
    fn test_parse_listen_addr_rejects_garbage() {
        assert!(BridgeConfig::parse_listen_addr("8080").is_err());
        assert!(BridgeConfig::parse_listen_addr(":http").is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = BridgeConfig::for_testing();
        config.command_timeout = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_paths_must_differ() {
        let mut config = BridgeConfig::for_testing();
        config.peer_path = config.observer_path.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nested_path_rejected() {
        let mut config = BridgeConfig::for_testing();
        config.peer_path = "game/mc".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_env_ws_addr_and_bad_port() {
        env::set_var("WS_ADDR", ":9191");
        env::remove_var("ROTARIA_COMMAND_TIMEOUT_SECS");
        env::remove_var("ROTARIA_OBSERVER_PATH");
        env::remove_var("ROTARIA_PEER_PATH");

        let config = BridgeConfig::from_env().unwrap();
        env::remove_var("WS_ADDR");

        assert_eq!(config.port, 9191);
        assert_eq!(config.command_timeout, DEFAULT_COMMAND_TIMEOUT);
        assert_eq!(config.observer_path, OBSERVER_WS_PATH);
        assert_eq!(config.peer_path, PEER_WS_PATH);

        // Same test: the environment is shared by every test thread
        env::set_var("ROTARIA_PORT", "80a");
        let result = BridgeConfig::from_env();
        env::remove_var("ROTARIA_PORT");

        assert!(matches!(result, Err(BridgeError::ConfigError(_))));
    }
}
