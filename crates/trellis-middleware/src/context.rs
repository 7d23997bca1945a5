//! Per-request middleware context.
//!
//! The [`MiddlewareContext`] carries state through the middleware chain and
//! into the handler. It plays three roles:
//!
//! - **Attribute store**: a string-keyed map any stage can write to and any
//!   later stage or handler can read from.
//! - **Path parameters**: the values captured by the matched route.
//! - **Error list**: errors that should be reported but must not change the
//!   response (for example a failed session save after the handler ran).

use std::any::Any;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Boxed error type recorded on the request error list.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Context that flows through the middleware chain.
///
/// # Example
///
/// ```
/// use trellis_middleware::context::MiddlewareContext;
///
/// #[derive(Debug, PartialEq)]
/// struct Tenant(&'static str);
///
/// let mut ctx = MiddlewareContext::new();
/// ctx.set("tenant", Tenant("acme"));
///
/// assert_eq!(ctx.get_as::<Tenant>("tenant"), Some(&Tenant("acme")));
/// assert!(ctx.get_as::<String>("tenant").is_none());
/// ```
pub struct MiddlewareContext {
    /// Unique identifier for this request (UUID v7).
    request_id: Uuid,

    /// When the request started processing.
    started_at: Instant,

    /// String-keyed attribute store.
    attributes: HashMap<String, Box<dyn Any + Send + Sync>>,

    /// Parameters captured by the matched route.
    params: HashMap<String, String>,

    /// Non-fatal errors recorded while handling the request.
    errors: Vec<BoxError>,
}

impl MiddlewareContext {
    /// Creates a new middleware context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(Uuid::now_v7())
    }

    /// Creates a context with a specific request ID.
    #[must_use]
    pub fn with_request_id(request_id: Uuid) -> Self {
        Self {
            request_id,
            started_at: Instant::now(),
            attributes: HashMap::new(),
            params: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stores a value under `key`, replacing any previous value.
    pub fn set<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.attributes.insert(key.into(), Box::new(value));
    }

    /// Returns the raw value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&(dyn Any + Send + Sync)> {
        self.attributes.get(key).map(|v| &**v)
    }

    /// Returns the value stored under `key` if it has type `T`.
    #[must_use]
    pub fn get_as<T: Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        self.attributes.get(key).and_then(|v| v.downcast_ref())
    }

    /// Removes and returns the value stored under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Box<dyn Any + Send + Sync>> {
        self.attributes.remove(key)
    }

    /// Removes the value under `key` if it has type `T`.
    ///
    /// A value of another type is left in place.
    pub fn take_as<T: Send + Sync + 'static>(&mut self, key: &str) -> Option<T> {
        if !self.attributes.get(key)?.is::<T>() {
            return None;
        }
        self.attributes
            .remove(key)
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Returns true if any value is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Replaces the route parameters.
    ///
    /// Called by the router once a route has matched.
    pub fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    /// Returns a route parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Returns all route parameters.
    #[must_use]
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Records a non-fatal error for this request.
    pub fn push_error(&mut self, error: impl Into<BoxError>) {
        self.errors.push(error.into());
    }

    /// Returns the errors recorded so far.
    #[must_use]
    pub fn errors(&self) -> &[BoxError] {
        &self.errors
    }

    /// Drains the recorded errors.
    pub fn take_errors(&mut self) -> Vec<BoxError> {
        std::mem::take(&mut self.errors)
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MiddlewareContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareContext")
            .field("request_id", &self.request_id)
            .field("attributes", &self.attributes.keys().collect::<Vec<_>>())
            .field("params", &self.params)
            .field("errors", &self.errors.len())
            .finish_non_exhaustive()
    }
}
