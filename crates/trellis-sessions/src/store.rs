//! The session store contract.
//!
//! A [`Store`] loads a [`StoreSession`] for a request and persists it again,
//! writing whatever cookie it needs into the pending response headers.
//! Stores are shared across requests and synchronise internally.

use std::collections::BTreeMap;

use async_trait::async_trait;
use http::header::{HeaderMap, HeaderValue, SET_COOKIE};

use crate::error::{LoadError, StoreError};
use crate::options::Options;
use crate::value::Value;

/// Flash queue used when no queue name is given.
pub const DEFAULT_FLASH_KEY: &str = "_flash";

/// A session record as a store sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSession {
    /// Store-assigned identifier.
    pub id: String,
    /// Session (and cookie) name.
    pub name: String,
    /// Session data.
    pub values: BTreeMap<String, Value>,
    /// Pending flash messages, by queue.
    pub flashes: BTreeMap<String, Vec<Value>>,
    /// Cookie options applied on save.
    pub options: Options,
    /// True if the store created this session for the current request.
    pub is_new: bool,
}

impl StoreSession {
    /// Creates an empty, new session.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            values: BTreeMap::new(),
            flashes: BTreeMap::new(),
            options: Options::default(),
            is_new: true,
        }
    }

    /// Sets the options, builder style.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Appends `value` to the flash queue `key`.
    pub fn add_flash(&mut self, value: Value, key: &str) {
        self.flashes.entry(key.to_string()).or_default().push(value);
    }

    /// Removes and returns the flash queue `key`.
    pub fn take_flashes(&mut self, key: &str) -> Vec<Value> {
        self.flashes.remove(key).unwrap_or_default()
    }
}

/// A pluggable session backend.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Loads the session `name` for a request with these headers.
    ///
    /// Returns a new session when the request carries none. A
    /// [`LoadError`] may still carry a usable session.
    async fn get(&self, request: &HeaderMap, name: &str) -> Result<StoreSession, LoadError>;

    /// Persists `session` and appends its cookie to `response`.
    ///
    /// A session whose options are expired is removed instead.
    async fn save(
        &self,
        request: &HeaderMap,
        response: &mut HeaderMap,
        session: &mut StoreSession,
    ) -> Result<(), StoreError>;

    /// Sets the options given to sessions created from now on.
    fn set_default_options(&self, options: Options);
}

/// Appends a `Set-Cookie` header for `session` carrying `value`.
///
/// Expired sessions get an empty, already expired cookie.
pub fn append_cookie(
    response: &mut HeaderMap,
    session: &StoreSession,
    value: &str,
) -> Result<(), StoreError> {
    let value = if session.options.is_expired() { "" } else { value };
    let header = HeaderValue::from_str(&session.options.set_cookie(&session.name, value))?;
    response.append(SET_COOKIE, header);
    Ok(())
}
