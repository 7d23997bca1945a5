//! Request routing and path matching.
//!
//! This module maps an incoming method and path to an [`Endpoint`]: the
//! route's handler plus the middleware of the group it was registered on.
//! Path templates use `{param}` segments.
//!
//! # Example
//!
//! ```rust
//! use trellis_server::router::{Endpoint, Router};
//! use trellis_middleware::{Pipeline, Response, ResponseExt};
//! use http::{Method, StatusCode};
//!
//! let mut router = Router::new();
//! router.add_route(
//!     Method::GET,
//!     "/users/{userId}",
//!     Endpoint::new(Pipeline::new(), |_ctx, _req| async {
//!         Response::text(StatusCode::OK, "user")
//!     }),
//! );
//!
//! let m = router.match_route(&Method::GET, "/users/42").unwrap();
//! assert_eq!(m.pattern(), "/users/{userId}");
//! assert_eq!(m.param("userId"), Some("42"));
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use http::Method;
use trellis_middleware::{BoxFuture, MiddlewareContext, Pipeline, Request, Response};

/// A type-erased route handler.
///
/// Handlers may read the context synchronously; the future they return owns
/// everything it needs.
pub type BoxHandler =
    Arc<dyn Fn(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// Wraps a handler function into a [`BoxHandler`].
pub fn boxed_handler<F, Fut>(handler: F) -> BoxHandler
where
    F: Fn(&mut MiddlewareContext, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(
        move |ctx: &mut MiddlewareContext, request: Request| -> BoxFuture<'static, Response> {
            Box::pin(handler(ctx, request))
        },
    )
}

/// What a route resolves to: group middleware followed by the handler.
pub struct Endpoint {
    middleware: Pipeline,
    handler: BoxHandler,
}

impl Endpoint {
    /// Creates an endpoint from a middleware pipeline and a handler function.
    pub fn new<F, Fut>(middleware: Pipeline, handler: F) -> Self
    where
        F: Fn(&mut MiddlewareContext, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self::from_boxed(middleware, boxed_handler(handler))
    }

    /// Creates an endpoint from an already boxed handler.
    #[must_use]
    pub fn from_boxed(middleware: Pipeline, handler: BoxHandler) -> Self {
        Self {
            middleware,
            handler,
        }
    }

    /// Returns the route-scoped middleware.
    #[must_use]
    pub fn middleware(&self) -> &Pipeline {
        &self.middleware
    }

    /// Runs the route-scoped middleware and then the handler.
    pub async fn call(&self, ctx: &mut MiddlewareContext, request: Request) -> Response {
        let handler = Arc::clone(&self.handler);
        self.middleware
            .process(ctx, request, move |ctx, request| handler(ctx, request))
            .await
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("middleware", &self.middleware)
            .finish_non_exhaustive()
    }
}

/// A matched route with extracted path parameters.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    endpoint: Arc<Endpoint>,
    pattern: String,
    params: HashMap<String, String>,
}

impl RouteMatch {
    /// Returns the pattern the route was registered with.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the extracted path parameters.
    #[must_use]
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Returns a specific path parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Splits the match into its endpoint and parameters.
    #[must_use]
    pub fn into_parts(self) -> (Arc<Endpoint>, HashMap<String, String>) {
        (self.endpoint, self.params)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    /// A literal segment (e.g., "users")
    Literal(String),

    /// A parameter segment (e.g., "{userId}")
    Param(String),
}

#[derive(Debug)]
struct Route {
    method: Method,
    segments: Vec<PathSegment>,
    pattern: String,
    endpoint: Arc<Endpoint>,
}

impl Route {
    fn new(method: Method, pattern: &str, endpoint: Endpoint) -> Self {
        Self {
            method,
            segments: Self::parse_segments(pattern),
            pattern: pattern.to_string(),
            endpoint: Arc::new(endpoint),
        }
    }

    fn parse_segments(pattern: &str) -> Vec<PathSegment> {
        pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s.starts_with('{') && s.ends_with('}') && s.len() > 2 {
                    PathSegment::Param(s[1..s.len() - 1].to_string())
                } else {
                    PathSegment::Literal(s.to_string())
                }
            })
            .collect()
    }

    fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        if path_segments.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();

        for (pattern, actual) in self.segments.iter().zip(path_segments.iter()) {
            match pattern {
                PathSegment::Literal(expected) => {
                    if expected != *actual {
                        return None;
                    }
                }
                PathSegment::Param(name) => {
                    params.insert(name.clone(), (*actual).to_string());
                }
            }
        }

        Some(params)
    }
}

/// HTTP request router.
///
/// Routes are checked in registration order; the first match wins.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Creates a new empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route to the router.
    pub fn add_route(&mut self, method: Method, pattern: impl AsRef<str>, endpoint: Endpoint) {
        let pattern = pattern.as_ref();
        tracing::debug!(%method, pattern, "registering route");
        self.routes.push(Route::new(method, pattern, endpoint));
    }

    /// Matches an incoming request to a route.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.routes.iter().find_map(|route| {
            if route.method != *method {
                return None;
            }
            route.match_path(path).map(|params| RouteMatch {
                endpoint: Arc::clone(&route.endpoint),
                pattern: route.pattern.clone(),
                params,
            })
        })
    }

    /// Returns `(method, pattern)` for every route, in registration order.
    #[must_use]
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.routes
            .iter()
            .map(|r| (r.method.clone(), r.pattern.clone()))
            .collect()
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use trellis_middleware::ResponseExt;

    fn endpoint(body: &'static str) -> Endpoint {
        Endpoint::new(Pipeline::new(), move |_ctx, _req| async move {
            Response::text(StatusCode::OK, body)
        })
    }

    #[test]
    fn test_literal_route() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/health", endpoint("ok"));

        assert!(router.match_route(&Method::GET, "/health").is_some());
        assert!(router.match_route(&Method::GET, "/health/").is_some());
        assert!(router.match_route(&Method::GET, "/healthz").is_none());
    }

    #[test]
    fn test_method_must_match() {
        let mut router = Router::new();
        router.add_route(Method::POST, "/users", endpoint("create"));

        assert!(router.match_route(&Method::GET, "/users").is_none());
        assert!(router.match_route(&Method::POST, "/users").is_some());
    }

    #[test]
    fn test_params_extracted() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/users/{userId}/posts/{postId}", endpoint("post"));

        let m = router
            .match_route(&Method::GET, "/users/7/posts/99")
            .expect("route should match");
        assert_eq!(m.param("userId"), Some("7"));
        assert_eq!(m.param("postId"), Some("99"));
        assert_eq!(m.params().len(), 2);
    }

    #[test]
    fn test_first_match_wins() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/items/{id}", endpoint("param"));
        router.add_route(Method::GET, "/items/special", endpoint("literal"));

        let m = router.match_route(&Method::GET, "/items/special").unwrap();
        assert_eq!(m.pattern(), "/items/{id}");
    }

    #[test]
    fn test_routes_listing() {
        let mut router = Router::new();
        assert!(router.is_empty());
        router.add_route(Method::GET, "/a", endpoint("a"));
        router.add_route(Method::DELETE, "/b", endpoint("b"));

        assert_eq!(router.len(), 2);
        assert_eq!(
            router.routes(),
            vec![
                (Method::GET, "/a".to_string()),
                (Method::DELETE, "/b".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_endpoint_call() {
        let endpoint = endpoint("hello");
        let mut ctx = MiddlewareContext::new();
        let request = http::Request::builder()
            .uri("/")
            .body(http_body_util::Full::new(bytes::Bytes::new()))
            .unwrap();

        let response = endpoint.call(&mut ctx, request).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
