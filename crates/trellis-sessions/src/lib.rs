//! # Trellis Sessions
//!
//! Per-request sessions backed by a pluggable [`Store`].
//!
//! [`SessionMiddleware`] attaches a lazily resolved [`Session`] (or a
//! [`SessionMap`] of named sessions) to every request. Handlers fetch it
//! with [`default`] and friends, read and write values, queue flash
//! messages, and the middleware persists whatever changed once the
//! handler chain returns.
//!
//! - A session is loaded from the store on first use, not before.
//! - A newly created session is saved straight away so its cookie is issued.
//! - After the handler, a session is saved only if it was written or never
//!   persisted. Save failures land on the request error list.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use http::StatusCode;
//! use trellis_middleware::{Response, ResponseExt};
//! use trellis_server::App;
//! use trellis_sessions::{MemoryStore, SessionMiddleware};
//!
//! let mut app = App::new();
//! app.use_middleware(SessionMiddleware::new("web", Arc::new(MemoryStore::new())));
//! app.get("/visit", |ctx, req| {
//!     let session = trellis_sessions::default(ctx, &req);
//!     async move {
//!         let Ok(session) = session else {
//!             return Response::text(StatusCode::INTERNAL_SERVER_ERROR, "no session");
//!         };
//!         let visits = session.get("visits").await.ok().flatten().and_then(|v| v.as_i64()).unwrap_or(0);
//!         let _ = session.set("visits", visits + 1).await;
//!         Response::text(StatusCode::OK, format!("{}", visits + 1))
//!     }
//! });
//! ```

#![doc(html_root_url = "https://docs.rs/trellis-sessions/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cookie;
mod error;
mod lookup;
mod middleware;
mod options;
mod session;
mod store;
pub mod stores;
mod value;

pub use error::{LoadError, SessionError, StoreError};
pub use lookup::{default, default_by_context, default_many, default_many_by_context, DEFAULT_KEY};
pub use middleware::{Binding, SessionMap, SessionMiddleware};
pub use options::{Options, SameSite};
pub use session::Session;
pub use store::{append_cookie, Store, StoreSession, DEFAULT_FLASH_KEY};
pub use stores::{FilesystemStore, MemoryStore};
pub use value::Value;
