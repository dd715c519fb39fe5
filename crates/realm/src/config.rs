//! Configuration management for the realm server.
//!
//! Settings are read from a TOML file. A missing file is replaced by the
//! defaults, written to disk so they can be edited. Command-line flags are
//! applied on top before validation.

use crate::cli::Args;
use anyhow::{anyhow, Context, Result};
use game_server::ServerConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Application configuration loaded from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerSettings,
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Accounts known to the in-memory account store
    #[serde(default)]
    pub accounts: Vec<AccountSettings>,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address to bind, e.g. "127.0.0.1:13001"
    pub bind_address: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Outbound frames buffered per connection
    #[serde(default = "default_send_queue_capacity")]
    pub send_queue_capacity: usize,
    /// Whether to set SO_REUSEPORT on the listener (Unix only)
    #[serde(default)]
    pub use_reuse_port: bool,
}

/// Fixed-step simulation pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    #[serde(default = "default_step_ms")]
    pub step_ms: u64,
    /// Largest amount of time processed in one catch-up burst
    #[serde(default = "default_max_backlog_ms")]
    pub max_backlog_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    #[serde(default)]
    pub json_format: bool,
}

/// An account accepted by token login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSettings {
    pub username: String,
    /// Login key handed out by the auth server
    pub key: u32,
}

fn default_max_connections() -> usize {
    1000
}

fn default_send_queue_capacity() -> usize {
    256
}

fn default_step_ms() -> u64 {
    10
}

fn default_max_backlog_ms() -> u64 {
    500
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            step_ms: default_step_ms(),
            max_backlog_ms: default_max_backlog_ms(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind_address: "127.0.0.1:13001".to_string(),
                max_connections: default_max_connections(),
                send_queue_capacity: default_send_queue_capacity(),
                use_reuse_port: false,
            },
            simulation: SimulationSettings::default(),
            logging: LoggingSettings::default(),
            accounts: vec![AccountSettings {
                username: "admin".to_string(),
                key: 1,
            }],
        }
    }
}

impl AppConfig {
    /// Loads the configuration from `path`, writing the defaults there first
    /// if the file does not exist.
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: AppConfig =
                toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("📝 Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies command-line overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(listen) = &args.listen {
            self.server.bind_address = listen.clone();
        }
        if let Some(max_connections) = args.max_connections {
            self.server.max_connections = max_connections;
        }
        if args.debug {
            self.logging.level = "debug".to_string();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
    }

    /// Checks the configuration for consistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_address.parse::<SocketAddr>().is_err() {
            return Err(format!("Invalid bind address: {}", self.server.bind_address));
        }

        if self.server.send_queue_capacity == 0 {
            return Err("send_queue_capacity must be positive".to_string());
        }

        if self.simulation.step_ms == 0 {
            return Err("Simulation step must be positive".to_string());
        }
        if self.simulation.max_backlog_ms < self.simulation.step_ms {
            return Err(format!(
                "max_backlog_ms ({}) must be at least one step ({})",
                self.simulation.max_backlog_ms, self.simulation.step_ms
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                self.logging.level
            ));
        }

        Ok(())
    }

    /// Converts the file settings into the core's [`ServerConfig`].
    pub fn to_server_config(&self) -> Result<ServerConfig> {
        let bind_address = self
            .server
            .bind_address
            .parse()
            .map_err(|e| anyhow!("Invalid bind address {}: {e}", self.server.bind_address))?;
        Ok(ServerConfig {
            bind_address,
            max_connections: self.server.max_connections,
            send_queue_capacity: self.server.send_queue_capacity,
            simulation_step: Duration::from_millis(self.simulation.step_ms),
            max_backlog: Duration::from_millis(self.simulation.max_backlog_ms),
            use_reuse_port: self.server.use_reuse_port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind_address, "127.0.0.1:13001");
        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.simulation.step_ms, 10);
        assert_eq!(config.simulation.max_backlog_ms, 500);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("realm.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:13001");
        assert!(path.exists());

        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.accounts, config.accounts);
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[server]
bind_address = "0.0.0.0:14000"
max_connections = 20

[simulation]
step_ms = 20
max_backlog_ms = 200

[logging]
level = "debug"
json_format = true

[[accounts]]
username = "alice"
key = 42
"#;
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:14000");
        assert_eq!(config.server.max_connections, 20);
        assert_eq!(config.server.send_queue_capacity, 256);
        assert!(config.logging.json_format);
        assert_eq!(config.accounts.len(), 1);
        assert_eq!(config.accounts[0].key, 42);

        let server_config = config.to_server_config().unwrap();
        assert_eq!(server_config.simulation_step, Duration::from_millis(20));
        assert_eq!(server_config.max_backlog, Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_invalid_toml_is_an_error() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "[server\nbind").await.unwrap();
        assert!(AppConfig::load_from_file(temp_file.path()).await.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.server.bind_address = "not an address".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.simulation.step_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.simulation.max_backlog_ms = 5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let mut config = AppConfig::default();
        let args = Args {
            listen: Some("0.0.0.0:15000".to_string()),
            debug: true,
            max_connections: Some(8),
            ..Args::default()
        };
        config.apply_args(&args);
        assert_eq!(config.server.bind_address, "0.0.0.0:15000");
        assert_eq!(config.server.max_connections, 8);
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.json_format);
    }
}
