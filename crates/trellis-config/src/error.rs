//! Errors raised while loading or validating a [`TrellisConfig`](crate::TrellisConfig).

use std::path::PathBuf;
use thiserror::Error;

/// A configuration source could not be turned into a valid configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required configuration file does not exist.
    #[error("no configuration file at {path}")]
    NotFound {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// A configuration or `.env` file exists but could not be read.
    #[error("cannot read {path}")]
    Read {
        /// The file being read.
        path: PathBuf,
        /// The I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The TOML document is malformed or has unknown keys.
    #[error("bad TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// The JSON document is malformed or has unknown keys.
    #[error("bad JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// Neither `toml` nor `json`.
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// A value parsed but is not usable, e.g. a filesystem store without a secret.
    #[error("{field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field, e.g. `session.secret`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An override variable could not be parsed into its field's type.
    #[error("environment variable {var}: {reason}")]
    Env {
        /// The variable name, prefix included.
        var: String,
        /// What was expected.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn env(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Env {
            var: var.into(),
            reason: reason.into(),
        }
    }
}
