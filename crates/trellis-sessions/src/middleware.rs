//! Session middleware.
//!
//! The middleware binds fresh [`Session`] handles to each request, runs the
//! rest of the chain, then saves every session and copies the resulting
//! `Set-Cookie` headers onto the response. A failed save is recorded on the
//! request error list and the response is left as the handler produced it.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use http::header::SET_COOKIE;
use trellis_middleware::{BoxFuture, Middleware, MiddlewareContext, Next, Request, Response};

use crate::lookup::DEFAULT_KEY;
use crate::session::Session;
use crate::store::Store;

/// Several named sessions bound to one request.
#[derive(Debug, Clone, Default)]
pub struct SessionMap {
    sessions: BTreeMap<String, Session>,
}

impl SessionMap {
    /// Returns the session called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Session> {
        self.sessions.get(name)
    }

    /// Returns the session names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }

    /// Returns the number of sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl FromIterator<Session> for SessionMap {
    fn from_iter<I: IntoIterator<Item = Session>>(iter: I) -> Self {
        Self {
            sessions: iter
                .into_iter()
                .map(|s| (s.name().to_string(), s))
                .collect(),
        }
    }
}

/// Where the middleware attaches sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// The context attribute store, under [`DEFAULT_KEY`].
    Attributes,
    /// The request extensions, which travel with the request.
    Context,
}

/// Middleware that provides sessions to downstream handlers.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use trellis_sessions::{MemoryStore, SessionMiddleware};
///
/// let store = Arc::new(MemoryStore::new());
/// let single = SessionMiddleware::new("web", store.clone());
/// let many = SessionMiddleware::many_by_context(["web", "admin"], store);
///
/// assert_eq!(single.names(), ["web"]);
/// assert_eq!(many.names(), ["web", "admin"]);
/// ```
pub struct SessionMiddleware {
    names: Vec<String>,
    store: Arc<dyn Store>,
    binding: Binding,
    many: bool,
}

impl SessionMiddleware {
    /// One session, bound to the attribute store.
    pub fn new(name: impl Into<String>, store: Arc<dyn Store>) -> Self {
        Self::build(vec![name.into()], store, Binding::Attributes, false)
    }

    /// One session, bound to the request extensions.
    pub fn by_context(name: impl Into<String>, store: Arc<dyn Store>) -> Self {
        Self::build(vec![name.into()], store, Binding::Context, false)
    }

    /// Several named sessions, bound to the attribute store.
    pub fn many<I, N>(names: I, store: Arc<dyn Store>) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        Self::build(names.into_iter().map(Into::into).collect(), store, Binding::Attributes, true)
    }

    /// Several named sessions, bound to the request extensions.
    pub fn many_by_context<I, N>(names: I, store: Arc<dyn Store>) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        Self::build(names.into_iter().map(Into::into).collect(), store, Binding::Context, true)
    }

    fn build(mut names: Vec<String>, store: Arc<dyn Store>, binding: Binding, many: bool) -> Self {
        // Keep the first occurrence of each name.
        let mut seen = HashSet::new();
        names.retain(|name| seen.insert(name.clone()));
        Self {
            names,
            store,
            binding,
            many,
        }
    }

    /// Returns the session names, in save order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns where sessions are attached.
    #[must_use]
    pub fn binding(&self) -> Binding {
        self.binding
    }

    fn attach(&self, ctx: &mut MiddlewareContext, request: &mut Request, sessions: &[Session]) {
        if self.many {
            let map: SessionMap = sessions.iter().cloned().collect();
            match self.binding {
                Binding::Attributes => ctx.set(DEFAULT_KEY, map),
                Binding::Context => {
                    request.extensions_mut().insert(map);
                }
            }
        } else if let Some(session) = sessions.first() {
            match self.binding {
                Binding::Attributes => ctx.set(DEFAULT_KEY, session.clone()),
                Binding::Context => {
                    request.extensions_mut().insert(session.clone());
                }
            }
        }
    }
}

impl Middleware for SessionMiddleware {
    fn name(&self) -> &'static str {
        "sessions"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        mut request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let sessions: Vec<Session> = self
                .names
                .iter()
                .map(|name| Session::new(name.clone(), request.headers().clone(), Arc::clone(&self.store)))
                .collect();
            self.attach(ctx, &mut request, &sessions);

            let mut response = next.run(ctx, request).await;

            for session in &sessions {
                if let Err(error) = session.save().await {
                    ctx.push_error(error);
                }
                let headers = session.response_headers().await;
                for value in headers.get_all(SET_COOKIE) {
                    response.headers_mut().append(SET_COOKIE, value.clone());
                }
            }

            response
        })
    }
}

impl fmt::Debug for SessionMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionMiddleware")
            .field("names", &self.names)
            .field("binding", &self.binding)
            .field("many", &self.many)
            .finish_non_exhaustive()
    }
}
