//! Configuration management for clawapi.
//!
//! Two sources are combined:
//!
//! ## Directory layout
//! Resolved from `CLAWAPI_HOME` or `~/.clawapi`. Holds sessions, install
//! flags, logs and the settings file (see [`Paths`]).
//!
//! ## Settings (TOML File)
//! Located at `<root>/config.toml`:
//! ```toml
//! [gateway]
//! host = "127.0.0.1"
//! port = 8855
//! model_prefix = "clawapi"
//!
//! [relay]
//! cycle_timeout_seconds = 300
//!
//! [logging]
//! level = "info"
//! ```
//!
//! The listen port can also be supplied by the process supervisor through
//! `CLAWAPI_PORT` or the `current_port` file; both win over the TOML value.

mod paths;
mod settings;

pub use paths::{HOME_ENV, Paths};
pub use settings::{GatewaySettings, LoggingSettings, RelaySettings, Settings, SettingsError};

/// Environment variable overriding the listen port.
pub const PORT_ENV: &str = "CLAWAPI_PORT";

/// Combined configuration: directory layout plus TOML settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub paths: Paths,
    pub settings: Settings,
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Home directory not found (set {HOME_ENV})")]
    HomeNotFound,

    #[error("Failed to prepare {path}: {source}")]
    Layout {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Invalid {PORT_ENV} value '{0}'")]
    InvalidPort(String),
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// This loads `.env` if present, resolves the root directory, creates
    /// the layout and reads (or creates) the settings file.
    pub fn load() -> Result<Self, ConfigError> {
        load_dotenv();
        let paths = Paths::resolve().ok_or(ConfigError::HomeNotFound)?;
        Self::load_with_paths(paths)
    }

    /// Load configuration rooted at an explicit directory layout.
    pub fn load_with_paths(paths: Paths) -> Result<Self, ConfigError> {
        paths.ensure_dirs().map_err(|source| ConfigError::Layout {
            path: paths.root().display().to_string(),
            source,
        })?;
        let settings = Settings::load_from(&paths.config_file())?;
        Ok(Self { paths, settings })
    }

    /// Effective listen port: `CLAWAPI_PORT` > `current_port` file > settings.
    pub fn port(&self) -> Result<u16, ConfigError> {
        if let Ok(raw) = std::env::var(PORT_ENV) {
            return raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()));
        }
        Ok(self
            .paths
            .recorded_port()
            .unwrap_or(self.settings.gateway.port))
    }

    /// Get the HTTP bind address.
    pub fn bind_addr(&self) -> Result<String, ConfigError> {
        Ok(format!("{}:{}", self.settings.gateway.host, self.port()?))
    }

    /// Whether the configured host is a loopback address.
    pub fn is_loopback(&self) -> bool {
        matches!(
            self.settings.gateway.host.as_str(),
            "127.0.0.1" | "localhost" | "::1"
        )
    }
}

/// Load .env file if it exists (for development convenience).
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}
