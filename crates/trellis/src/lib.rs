//! # Trellis
//!
//! Deferred route registration and per-request sessions on a small async
//! HTTP stack.
//!
//! - **Boot**: feature modules queue middleware, route groups and routes on
//!   a [`Registry`](boot::Registry) before the application exists; one
//!   `init` call replays them in a fixed order (middleware, groups, routes).
//! - **Sessions**: [`SessionMiddleware`](sessions::SessionMiddleware) gives
//!   every request a lazily loaded session from a pluggable store and saves
//!   it once the handler is done.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trellis::prelude::*;
//! use http::StatusCode;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().with_dotenv().with_env_prefix("TRELLIS").load()?;
//!     init_logging(&config.logging.to_log_config())?;
//!
//!     let mut boot = AppRegistry::new();
//!     let store = config.session.build_store()?;
//!     let name = config.session.name.clone();
//!     boot.middleware(move |app: &mut App| {
//!         app.use_middleware(SessionMiddleware::new(name, store));
//!     });
//!     boot.route(|app: &mut App| {
//!         app.get("/", |_ctx, _req| async { Response::text(StatusCode::OK, "hello") });
//!     });
//!
//!     let mut app = App::new();
//!     boot.init(&mut app);
//!     app.serve(config.server.socket_addr()?).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Request Flow
//!
//! ```text
//! Request → global middleware (sessions, ...) → group middleware → Handler
//!                                                                    ↓
//! Response ← Set-Cookie, session save ←─────────────────────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/trellis/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export middleware types
pub use trellis_middleware as middleware;

// Re-export server types
pub use trellis_server as server;

// Re-export boot registration
pub use trellis_boot as boot;

// Re-export sessions
pub use trellis_sessions as sessions;

// Re-export configuration
pub use trellis_config as config;

// Re-export telemetry
pub use trellis_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use trellis::prelude::*;
///
/// let mut boot = AppRegistry::new();
/// boot.route(|app: &mut App| {
///     let _api = app.group("/api");
/// });
/// ```
pub mod prelude {
    pub use trellis_boot::{AppRegistry, GroupRegistry, Registry};
    pub use trellis_config::{ConfigLoader, TrellisConfig};
    pub use trellis_middleware::{
        Middleware, MiddlewareContext, Next, Pipeline, Request, Response, ResponseExt,
    };
    pub use trellis_server::{App, RouterGroup};
    pub use trellis_sessions::{
        default as default_session, default_by_context, default_many, default_many_by_context,
        MemoryStore, FilesystemStore, Options, Session, SessionError, SessionMiddleware, Store, Value,
    };
    pub use trellis_telemetry::{init_logging, LogConfig};
}
