//! Finding the sessions the middleware attached.
//!
//! Attribute-store bindings are checked before request extensions, so a
//! handler does not need to know which constructor installed the middleware.

use trellis_middleware::{MiddlewareContext, Request};

use crate::error::SessionError;
use crate::middleware::SessionMap;
use crate::session::Session;

/// Attribute-store key sessions are attached under.
pub const DEFAULT_KEY: &str = "trellis/sessions";

/// Returns the single session for this request.
pub fn default(ctx: &MiddlewareContext, request: &Request) -> Result<Session, SessionError> {
    match ctx.get(DEFAULT_KEY) {
        Some(value) => value
            .downcast_ref::<Session>()
            .cloned()
            .ok_or(SessionError::WrongBinding {
                key: DEFAULT_KEY,
                expected: "single session",
            }),
        None => default_by_context(request),
    }
}

/// Returns the single session attached to the request extensions.
pub fn default_by_context(request: &Request) -> Result<Session, SessionError> {
    let extensions = request.extensions();
    if let Some(session) = extensions.get::<Session>() {
        return Ok(session.clone());
    }
    if extensions.get::<SessionMap>().is_some() {
        return Err(SessionError::WrongBinding {
            key: DEFAULT_KEY,
            expected: "single session",
        });
    }
    Err(SessionError::NotAttached { key: DEFAULT_KEY })
}

/// Returns the session called `name` for this request.
pub fn default_many(
    ctx: &MiddlewareContext,
    request: &Request,
    name: &str,
) -> Result<Session, SessionError> {
    match ctx.get(DEFAULT_KEY) {
        Some(value) => {
            let map = value
                .downcast_ref::<SessionMap>()
                .ok_or(SessionError::WrongBinding {
                    key: DEFAULT_KEY,
                    expected: "session map",
                })?;
            pick(map, name)
        }
        None => default_many_by_context(request, name),
    }
}

/// Returns the session called `name` from the request extensions.
pub fn default_many_by_context(request: &Request, name: &str) -> Result<Session, SessionError> {
    let extensions = request.extensions();
    if let Some(map) = extensions.get::<SessionMap>() {
        return pick(map, name);
    }
    if extensions.get::<Session>().is_some() {
        return Err(SessionError::WrongBinding {
            key: DEFAULT_KEY,
            expected: "session map",
        });
    }
    Err(SessionError::NotAttached { key: DEFAULT_KEY })
}

fn pick(map: &SessionMap, name: &str) -> Result<Session, SessionError> {
    map.get(name).cloned().ok_or_else(|| SessionError::UnknownSession {
        name: name.to_string(),
    })
}
