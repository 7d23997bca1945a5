//! # Trellis Boot
//!
//! Deferred registration for Trellis applications.
//!
//! Feature modules register middleware, route groups and routes against a
//! [`Registry`] before the application exists. At startup the registry is
//! replayed against the real [`App`](trellis_server::App) in a fixed order:
//! middleware first, then groups, then routes. Route callbacks can target a
//! group by name; the group is resolved at replay time.
//!
//! ## Example
//!
//! ```rust
//! use trellis_boot::AppRegistry;
//! use trellis_middleware::{Response, ResponseExt};
//! use trellis_server::App;
//! use http::StatusCode;
//!
//! let mut boot = AppRegistry::new();
//!
//! boot.group_by_name("api", |api| {
//!     api.get("/status", |_ctx, _req| async { Response::text(StatusCode::OK, "up") });
//! });
//!
//! let groups = boot.groups();
//! boot.group(move |app: &mut App| groups.add("api", app.group("/api")));
//!
//! let mut app = App::new();
//! boot.init(&mut app);
//! assert_eq!(app.route_count(), 1);
//! ```

#![doc(html_root_url = "https://docs.rs/trellis-boot/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod groups;
mod registry;

pub use groups::GroupRegistry;
pub use registry::{Registry, ServerCallback};

/// A registry bound to the Trellis application types.
pub type AppRegistry = Registry<trellis_server::App, trellis_server::RouterGroup>;
