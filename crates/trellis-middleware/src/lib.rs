//! # Trellis Middleware
//!
//! Middleware chain implementation for the Trellis framework.
//!
//! This crate provides the pieces every request flows through:
//!
//! - [`Middleware`] - the trait implemented by each middleware stage
//! - [`Next`] - the continuation handed to a stage, invoked exactly once
//! - [`MiddlewareContext`] - per-request state: attribute store, path
//!   parameters and the request error list
//! - [`Pipeline`] - an ordered list of middleware, run in registration order
//!
//! ## Request Flow
//!
//! ```text
//! Request → Stage 1 → Stage 2 → ... → Handler
//!                                        ↓
//! Response ← Stage 1 ← Stage 2 ← ... ←──┘
//! ```
//!
//! Unlike a fixed pipeline, stages are appended by the application (usually
//! through the boot registry) and run in the order they were added.
//!
//! ## Example
//!
//! ```
//! use trellis_middleware::context::MiddlewareContext;
//!
//! let mut ctx = MiddlewareContext::new();
//! ctx.set("user", "alice".to_string());
//! assert_eq!(ctx.get_as::<String>("user").map(String::as_str), Some("alice"));
//! ```

#![doc(html_root_url = "https://docs.rs/trellis-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod middleware;
pub mod pipeline;
pub mod types;

// Re-export main types at crate root
pub use context::{BoxError, MiddlewareContext};
pub use middleware::{BoxFuture, Middleware, Next};
pub use pipeline::{BoxedMiddleware, Pipeline, PipelineBuilder};
pub use types::{Request, Response, ResponseExt};
