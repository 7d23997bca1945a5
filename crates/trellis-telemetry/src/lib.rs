//! # Trellis Telemetry
//!
//! Logging setup shared by Trellis applications.
//!
//! - [`init_logging`] installs the global `tracing` subscriber
//! - [`LogConfig`] and [`LogFormat`] describe the output
//! - [`fields`] names the structured fields used across the workspace

#![doc(html_root_url = "https://docs.rs/trellis-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{create_env_filter, fields, init_logging, LogConfig, LogFormat};
