//! Typed configuration for Trellis applications.
//!
//! - TOML and JSON files
//! - Environment overrides (`TRELLIS__SECTION__KEY`), optionally from `.env`
//! - Strict parsing: unknown fields are rejected
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [session]
//! name = "shop"
//! store = "filesystem"
//! directory = "./runtime/sessions"
//! secret = "change-me"
//!
//! [session.cookie]
//! max_age = 86400
//! http_only = true
//! same_site = "lax"
//! ```

#![doc(html_root_url = "https://docs.rs/trellis-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;

pub use config::{LoggingConfig, ServerConfig, SessionConfig, StoreKind, TrellisConfig};
pub use error::ConfigError;
pub use loader::ConfigLoader;
