//! Configuration types.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use trellis_sessions::{FilesystemStore, MemoryStore, Options, Store};
use trellis_telemetry::{LogConfig, LogFormat};

use crate::ConfigError;

/// Complete application configuration.
///
/// # Example
///
/// ```
/// use trellis_config::{StoreKind, TrellisConfig};
///
/// let config = TrellisConfig::default();
/// assert_eq!(config.server.http_addr, "127.0.0.1:8080");
/// assert_eq!(config.session.store, StoreKind::Memory);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct TrellisConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Session settings.
    #[serde(default)]
    pub session: SessionConfig,
}

impl TrellisConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - the server address does not parse
    /// - the session name is empty
    /// - the filesystem store is selected without a secret or directory
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.socket_addr()?;

        if self.session.name.trim().is_empty() {
            return Err(ConfigError::invalid("session.name", "must not be empty"));
        }

        if self.session.store == StoreKind::Filesystem {
            if self.session.secret.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::invalid(
                    "session.secret",
                    "required for the filesystem store",
                ));
            }
            if self.session.directory.as_os_str().is_empty() {
                return Err(ConfigError::invalid(
                    "session.directory",
                    "required for the filesystem store",
                ));
            }
        }

        Ok(())
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address.
    pub http_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

impl ServerConfig {
    /// Parses the listen address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.http_addr.parse().map_err(|_| {
            ConfigError::invalid(
                "server.http_addr",
                format!("invalid socket address: {}", self.http_addr),
            )
        })
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Whether logging is enabled.
    pub enabled: bool,
    /// Filter directive.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Include file and line in log lines.
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Converts to the settings [`trellis_telemetry::init_logging`] takes.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            format: self.format,
            include_location: self.include_location,
            ..LogConfig::default()
        }
    }
}

/// Which session store to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// [`MemoryStore`].
    #[default]
    Memory,
    /// [`FilesystemStore`].
    Filesystem,
}

/// Session settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Session and cookie name.
    pub name: String,
    /// Store backend.
    pub store: StoreKind,
    /// Directory for the filesystem store.
    pub directory: PathBuf,
    /// Cookie signing secret for the filesystem store.
    pub secret: Option<String>,
    /// Default cookie options for new sessions.
    pub cookie: Options,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "trellis_session".to_string(),
            store: StoreKind::Memory,
            directory: PathBuf::from("./runtime/sessions"),
            secret: None,
            cookie: Options::default(),
        }
    }
}

impl SessionConfig {
    /// Builds the configured store with the cookie options as defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the filesystem store has no
    /// secret.
    pub fn build_store(&self) -> Result<Arc<dyn Store>, ConfigError> {
        let store: Arc<dyn Store> = match self.store {
            StoreKind::Memory => Arc::new(MemoryStore::new()),
            StoreKind::Filesystem => {
                let secret = self
                    .secret
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        ConfigError::invalid("session.secret", "required for the filesystem store")
                    })?;
                Arc::new(FilesystemStore::new(&self.directory, secret))
            }
        };
        store.set_default_options(self.cookie.clone());
        Ok(store)
    }
}
