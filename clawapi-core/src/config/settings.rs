//! Settings configuration loaded from TOML files.
//!
//! This module handles non-sensitive configuration stored in TOML format
//! in the clawapi root directory (`~/.clawapi/config.toml`).

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default TOML configuration file content
const DEFAULT_CONFIG_TOML: &str = r#"# clawapi configuration file
# Located at: ~/.clawapi/config.toml (or $CLAWAPI_HOME/config.toml)
#
# Sessions are never stored here. Each provider keeps its cookie collection
# and captured user agent under sessions/<provider>/.

[gateway]
host = "127.0.0.1"
port = 8855
# Namespace used for the prefixed model identifiers ("clawapi/claude")
model_prefix = "clawapi"

[relay]
# Upper bound for one full upstream cycle (0 disables the deadline)
cycle_timeout_seconds = 300
connect_timeout_seconds = 30

[logging]
level = "info"
# dump_queries = true
"#;

/// Settings loaded from TOML configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    /// Gateway server configuration
    #[serde(default)]
    pub gateway: GatewaySettings,

    /// Upstream relay configuration
    #[serde(default)]
    pub relay: RelaySettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Gateway server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewaySettings {
    /// Host to bind to
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Namespace for prefixed model identifiers
    #[serde(default = "default_model_prefix")]
    pub model_prefix: String,
}

/// Upstream relay settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelaySettings {
    /// Deadline for one serialized adapter cycle, in seconds. Zero disables it.
    #[serde(default = "default_cycle_timeout_seconds")]
    pub cycle_timeout_seconds: u64,

    /// TCP connect timeout for upstream calls, in seconds.
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
}

/// Logging settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Dump upstream completion requests and answers to `logs/queries/`
    #[serde(default)]
    pub dump_queries: bool,
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8855
}

fn default_model_prefix() -> String {
    "clawapi".to_string()
}

fn default_cycle_timeout_seconds() -> u64 {
    300
}

fn default_connect_timeout_seconds() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            model_prefix: default_model_prefix(),
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            cycle_timeout_seconds: default_cycle_timeout_seconds(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dump_queries: false,
        }
    }
}

impl RelaySettings {
    /// Deadline applied to each upstream cycle, if any.
    pub fn cycle_timeout(&self) -> Option<Duration> {
        (self.cycle_timeout_seconds > 0).then(|| Duration::from_secs(self.cycle_timeout_seconds))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

impl Settings {
    /// Load settings from the given TOML file.
    ///
    /// If the file doesn't exist, creates it with default values first.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            tracing::info!("Creating default configuration at {:?}", path);
            Self::create_default_config(path)?;
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        // Both model id forms must stay distinct in the listing
        if self.gateway.model_prefix.trim().is_empty() {
            return Err(SettingsError::Invalid(
                "gateway.model_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn create_default_config(path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_CONFIG_TOML)?;
        Ok(())
    }
}
