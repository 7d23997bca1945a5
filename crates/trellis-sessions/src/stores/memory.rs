//! In-process session store.

use async_trait::async_trait;
use dashmap::DashMap;
use http::HeaderMap;
use parking_lot::RwLock;

use crate::cookie::cookie_value;
use crate::error::{LoadError, StoreError};
use crate::options::Options;
use crate::store::{append_cookie, Store, StoreSession};

use super::{expires_at, new_session_id, unix_now};

#[derive(Debug, Clone)]
struct Entry {
    session: StoreSession,
    expires_at: Option<i64>,
}

impl Entry {
    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Keeps sessions in memory, keyed by `(name, id)`.
///
/// The cookie carries the bare session id. Data is lost on restart, so this
/// store suits tests and single-process development servers. A session saved
/// with a positive `max_age` is forgotten once that many seconds pass.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: DashMap<(String, String), Entry>,
    defaults: RwLock<Options>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops every expired session and returns how many were dropped.
    pub fn cleanup(&self) -> usize {
        let now = unix_now();
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.sessions.len())
    }

    fn fresh(&self, name: &str) -> StoreSession {
        StoreSession::new(new_session_id(), name).with_options(self.defaults.read().clone())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, request: &HeaderMap, name: &str) -> Result<StoreSession, LoadError> {
        let now = unix_now();
        let stored = cookie_value(request, name).and_then(|id| {
            let key = (name.to_string(), id);
            let entry = self.sessions.get(&key).map(|entry| entry.value().clone())?;
            if entry.is_expired(now) {
                self.sessions.remove(&key);
                tracing::debug!(session = %name, "expired session dropped");
                return None;
            }
            Some(entry.session)
        });

        Ok(match stored {
            Some(mut session) => {
                session.is_new = false;
                session
            }
            None => self.fresh(name),
        })
    }

    async fn save(
        &self,
        _request: &HeaderMap,
        response: &mut HeaderMap,
        session: &mut StoreSession,
    ) -> Result<(), StoreError> {
        let key = (session.name.clone(), session.id.clone());
        if session.options.is_expired() {
            self.sessions.remove(&key);
        } else {
            let entry = Entry {
                session: session.clone(),
                expires_at: expires_at(session.options.max_age, unix_now()),
            };
            self.sessions.insert(key, entry);
        }
        append_cookie(response, session, &session.id)
    }

    fn set_default_options(&self, options: Options) {
        *self.defaults.write() = options;
    }
}
