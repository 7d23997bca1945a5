//! Session error types.

use thiserror::Error;

use crate::store::StoreSession;

/// Errors raised by a session store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing session data failed.
    #[error("session store IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Session data could not be encoded or decoded.
    #[error("session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The session cookie was not signed by this store.
    #[error("session cookie signature is invalid")]
    InvalidSignature,

    /// The session outlived its `max_age`.
    #[error("session has expired")]
    Expired,

    /// A `Set-Cookie` header could not be built.
    #[error("invalid session cookie header: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    /// Any other store failure.
    #[error("{0}")]
    Other(String),
}

/// A failed store lookup.
///
/// Some failures still leave a usable session behind: an unreadable cookie
/// or a missing record is reported, but the store hands back a fresh
/// session so the request can carry on.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct LoadError {
    /// The session the store could still produce, if any.
    pub partial: Option<Box<StoreSession>>,

    /// What went wrong.
    #[source]
    pub source: StoreError,
}

impl LoadError {
    /// A load failure with no usable session.
    #[must_use]
    pub fn new(source: StoreError) -> Self {
        Self {
            partial: None,
            source,
        }
    }

    /// A load failure that still produced `session`.
    #[must_use]
    pub fn with_partial(source: StoreError, session: StoreSession) -> Self {
        Self {
            partial: Some(Box::new(session)),
            source,
        }
    }
}

/// Errors surfaced by [`Session`](crate::Session) operations and lookups.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The store could not produce a session at all.
    #[error("store get session {name} error: {source}")]
    Load {
        /// Session name.
        name: String,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },

    /// Persisting the session failed.
    #[error("session {name} save error: {source}")]
    Save {
        /// Session name.
        name: String,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },

    /// No session middleware ran for this request.
    #[error("no session attached under '{key}'")]
    NotAttached {
        /// The attachment key that was checked.
        key: &'static str,
    },

    /// Something other than the expected session binding is stored under the key.
    #[error("value under '{key}' is not a {expected}")]
    WrongBinding {
        /// The attachment key that was checked.
        key: &'static str,
        /// What the caller asked for.
        expected: &'static str,
    },

    /// The multi-session binding has no session with this name.
    #[error("no session named '{name}' is attached")]
    UnknownSession {
        /// Requested session name.
        name: String,
    },

    /// A typed value could not be converted.
    #[error("session value conversion error: {0}")]
    Serialization(#[from] serde_json::Error),
}
