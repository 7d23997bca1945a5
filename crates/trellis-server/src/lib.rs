//! # Trellis Server
//!
//! The application handle and HTTP serving for the Trellis framework.
//!
//! - [`App`] - global middleware, routes, and route groups
//! - [`RouterGroup`] - a cloneable handle registering routes under a prefix
//! - [`router`] - method and `{param}` path matching
//! - [`App::serve`] - HTTP/1.1 serving via Hyper
//!
//! ## Example
//!
//! ```rust,no_run
//! use trellis_server::App;
//! use trellis_middleware::{Response, ResponseExt};
//! use http::StatusCode;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), trellis_server::ServerError> {
//!     let mut app = App::new();
//!     app.get("/health", |_ctx, _req| async { Response::text(StatusCode::OK, "ok") });
//!     app.serve("127.0.0.1:8080".parse().unwrap()).await
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/trellis-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod error;
pub mod router;
mod server;

pub use app::{App, RouterGroup};
pub use error::ServerError;
pub use router::{BoxHandler, Endpoint, RouteMatch, Router};
