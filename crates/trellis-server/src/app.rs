//! The application: global middleware, route table and route groups.
//!
//! [`App`] is the server handle that boot callbacks receive. It owns the
//! global [`Pipeline`] and shares its route table with every
//! [`RouterGroup`] created from it, so a group handle stored away during
//! startup can keep registering routes later.

use std::future::Future;
use std::sync::Arc;

use http::{Method, StatusCode};
use parking_lot::RwLock;
use trellis_middleware::{
    Middleware, MiddlewareContext, Pipeline, Request, Response, ResponseExt,
};

use crate::router::{Endpoint, RouteMatch, Router};

/// The application handle.
///
/// # Example
///
/// ```rust
/// use trellis_server::App;
/// use trellis_middleware::{Response, ResponseExt};
/// use http::StatusCode;
///
/// let mut app = App::new();
/// app.get("/ping", |_ctx, _req| async { Response::text(StatusCode::OK, "pong") });
///
/// let api = app.group("/api/v1");
/// api.get("/users/{id}", |ctx, _req| {
///     let id = ctx.param("id").unwrap_or_default().to_string();
///     async move { Response::text(StatusCode::OK, id) }
/// });
///
/// assert_eq!(app.route_count(), 2);
/// ```
#[derive(Default)]
pub struct App {
    middleware: Pipeline,
    router: Arc<RwLock<Router>>,
}

impl App {
    /// Creates an application with no middleware and no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends global middleware. Runs for every request, in the order added.
    pub fn use_middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        tracing::debug!(middleware = middleware.name(), "adding global middleware");
        self.middleware.push(middleware);
        self
    }

    /// Registers a route on the application root.
    pub fn route<F, Fut>(&mut self, method: Method, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut MiddlewareContext, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.router
            .write()
            .add_route(method, join_paths("", path), Endpoint::new(Pipeline::new(), handler));
        self
    }

    /// Registers a `GET` route.
    pub fn get<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut MiddlewareContext, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::GET, path, handler)
    }

    /// Registers a `POST` route.
    pub fn post<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut MiddlewareContext, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::POST, path, handler)
    }

    /// Registers a `PUT` route.
    pub fn put<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut MiddlewareContext, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::PUT, path, handler)
    }

    /// Registers a `DELETE` route.
    pub fn delete<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut MiddlewareContext, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::DELETE, path, handler)
    }

    /// Registers a `PATCH` route.
    pub fn patch<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut MiddlewareContext, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::PATCH, path, handler)
    }

    /// Creates a route group under `prefix`.
    ///
    /// The group shares this application's route table.
    #[must_use]
    pub fn group(&self, prefix: &str) -> RouterGroup {
        RouterGroup {
            prefix: join_paths("", prefix),
            middleware: Pipeline::new(),
            router: Arc::clone(&self.router),
        }
    }

    /// Returns the names of the global middleware, in order.
    #[must_use]
    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.middleware.stage_names()
    }

    /// Returns `(method, pattern)` for every registered route.
    #[must_use]
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.router.read().routes()
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.router.read().len()
    }

    /// Handles one request in memory.
    ///
    /// Runs the global middleware, resolves the route, runs the group
    /// middleware and the handler. Errors recorded on the request error list
    /// are logged once the response is complete.
    pub async fn handle(&self, request: Request) -> Response {
        let mut ctx = MiddlewareContext::new();
        self.handle_with_context(&mut ctx, request).await
    }

    /// Like [`App::handle`], with a caller-provided context.
    ///
    /// The context is left in place afterwards so callers can inspect the
    /// attribute store and the recorded errors.
    pub async fn handle_with_context(
        &self,
        ctx: &mut MiddlewareContext,
        request: Request,
    ) -> Response {
        let router = Arc::clone(&self.router);
        let response = self
            .middleware
            .process(ctx, request, move |ctx, request| {
                Box::pin(async move { dispatch(&router, ctx, request).await })
            })
            .await;

        for error in ctx.errors() {
            tracing::warn!(request_id = %ctx.request_id(), error = %error, "request error");
        }

        response
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("middleware", &self.middleware)
            .field("routes", &self.route_count())
            .finish()
    }
}

fn lookup(router: &RwLock<Router>, method: &Method, path: &str) -> Option<RouteMatch> {
    router.read().match_route(method, path)
}

async fn dispatch(
    router: &RwLock<Router>,
    ctx: &mut MiddlewareContext,
    request: Request,
) -> Response {
    let Some(matched) = lookup(router, request.method(), request.uri().path()) else {
        tracing::debug!(method = %request.method(), path = request.uri().path(), "no route matched");
        return Response::json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "no route matched");
    };

    let (endpoint, params) = matched.into_parts();
    ctx.set_params(params);
    endpoint.call(ctx, request).await
}

/// A handle to a group of routes sharing a path prefix and middleware.
///
/// Cloning is cheap and every clone registers into the same route table.
/// Group middleware is captured when a route is registered, so add it
/// before registering routes.
#[derive(Clone)]
pub struct RouterGroup {
    prefix: String,
    middleware: Pipeline,
    router: Arc<RwLock<Router>>,
}

impl RouterGroup {
    /// Returns the group's path prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the names of the group's middleware, in order.
    #[must_use]
    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.middleware.stage_names()
    }

    /// Adds group middleware, builder style.
    #[must_use]
    pub fn with_middleware(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Adds group middleware in place.
    pub fn use_middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Creates a nested group. It inherits this group's middleware.
    #[must_use]
    pub fn group(&self, prefix: &str) -> RouterGroup {
        RouterGroup {
            prefix: join_paths(&self.prefix, prefix),
            middleware: self.middleware.clone(),
            router: Arc::clone(&self.router),
        }
    }

    /// Registers a route under this group's prefix.
    pub fn route<F, Fut>(&self, method: Method, path: &str, handler: F) -> &Self
    where
        F: Fn(&mut MiddlewareContext, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let endpoint = Endpoint::new(self.middleware.clone(), handler);
        self.router
            .write()
            .add_route(method, join_paths(&self.prefix, path), endpoint);
        self
    }

    /// Registers a `GET` route.
    pub fn get<F, Fut>(&self, path: &str, handler: F) -> &Self
    where
        F: Fn(&mut MiddlewareContext, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::GET, path, handler)
    }

    /// Registers a `POST` route.
    pub fn post<F, Fut>(&self, path: &str, handler: F) -> &Self
    where
        F: Fn(&mut MiddlewareContext, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::POST, path, handler)
    }

    /// Registers a `PUT` route.
    pub fn put<F, Fut>(&self, path: &str, handler: F) -> &Self
    where
        F: Fn(&mut MiddlewareContext, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::PUT, path, handler)
    }

    /// Registers a `DELETE` route.
    pub fn delete<F, Fut>(&self, path: &str, handler: F) -> &Self
    where
        F: Fn(&mut MiddlewareContext, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::DELETE, path, handler)
    }

    /// Registers a `PATCH` route.
    pub fn patch<F, Fut>(&self, path: &str, handler: F) -> &Self
    where
        F: Fn(&mut MiddlewareContext, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Method::PATCH, path, handler)
    }
}

impl std::fmt::Debug for RouterGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterGroup")
            .field("prefix", &self.prefix)
            .field("middleware", &self.middleware)
            .finish_non_exhaustive()
    }
}

/// Joins a group prefix and a relative path into an absolute pattern.
fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{path}"),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}/{path}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};
    use trellis_middleware::{BoxFuture, Next};

    struct Tag(&'static str);

    impl Middleware for Tag {
        fn name(&self) -> &'static str {
            self.0
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                let mut order: Vec<&'static str> = ctx.take_as("order").unwrap_or_default();
                order.push(self.0);
                ctx.set("order", order);
                next.run(ctx, request).await
            })
        }
    }

    struct Failing;

    impl Middleware for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                let response = next.run(ctx, request).await;
                ctx.push_error("post-handler failure");
                response
            })
        }
    }

    fn request(method: Method, path: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri(path)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("", ""), "/");
        assert_eq!(join_paths("", "users"), "/users");
        assert_eq!(join_paths("/api/", "/users"), "/api/users");
        assert_eq!(join_paths("/api", ""), "/api");
        assert_eq!(join_paths("/api", "/"), "/api");
    }

    #[tokio::test]
    async fn test_root_route() {
        let mut app = App::new();
        app.get("/hello", |_ctx, _req| async { Response::text(StatusCode::OK, "world") });

        let response = app.handle(request(Method::GET, "/hello")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "world");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = App::new();
        let response = app.handle(request(Method::GET, "/missing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_group_prefix_and_params() {
        let app = App::new();
        let api = app.group("/api");
        let users = api.group("users");
        users.get("/{id}", |ctx, _req| {
            let id = ctx.param("id").unwrap_or_default().to_string();
            async move { Response::text(StatusCode::OK, id) }
        });

        assert_eq!(users.prefix(), "/api/users");
        assert_eq!(app.routes(), vec![(Method::GET, "/api/users/{id}".to_string())]);

        let response = app.handle(request(Method::GET, "/api/users/17")).await;
        assert_eq!(body_text(response).await, "17");
    }

    #[tokio::test]
    async fn test_global_then_group_middleware() {
        let mut app = App::new();
        app.use_middleware(Tag("global"));
        let admin = app.group("/admin").with_middleware(Tag("admin"));
        admin.get("/", |ctx, _req| {
            let order: Vec<&'static str> = ctx.get_as::<Vec<&'static str>>("order").cloned().unwrap_or_default();
            async move { Response::text(StatusCode::OK, order.join(",")) }
        });

        assert_eq!(app.middleware_names(), vec!["global"]);
        assert_eq!(admin.middleware_names(), vec!["admin"]);

        let response = app.handle(request(Method::GET, "/admin")).await;
        assert_eq!(body_text(response).await, "global,admin");
    }

    #[tokio::test]
    async fn test_group_clone_shares_route_table() {
        let app = App::new();
        let group = app.group("/shared");
        let clone = group.clone();
        clone.post("/item", |_ctx, _req| async { Response::text(StatusCode::CREATED, "") });

        assert_eq!(app.route_count(), 1);
        let response = app.handle(request(Method::POST, "/shared/item")).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_patch_routes() {
        let mut app = App::new();
        app.patch("/profile", |_ctx, _req| async { Response::text(StatusCode::OK, "root") });
        app.group("/v1")
            .patch("/profile", |_ctx, _req| async { Response::text(StatusCode::OK, "v1") });

        let response = app.handle(request(Method::PATCH, "/v1/profile")).await;
        assert_eq!(body_text(response).await, "v1");
        let response = app.handle(request(Method::GET, "/profile")).await;
        assert_ne!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_recorded_errors_do_not_change_response() {
        let mut app = App::new();
        app.use_middleware(Failing);
        app.get("/", |_ctx, _req| async { Response::text(StatusCode::OK, "fine") });

        let mut ctx = MiddlewareContext::new();
        let response = app.handle_with_context(&mut ctx, request(Method::GET, "/")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(ctx.errors()[0].to_string(), "post-handler failure");
    }
}
