//! The per-request session handle.
//!
//! A [`Session`] is bound to one request, one store and one session name.
//! The store is not consulted until the first operation needs the data;
//! that first access is where a load failure surfaces, so every operation
//! returns a `Result`.
//!
//! Persisting follows two flags. Mutations mark the session *written*, and
//! a session the store just created counts as needing a save until it has
//! been persisted once. A new session that loaded without error is saved as
//! soon as it is resolved so its cookie exists before the handler produces a
//! response.

use std::fmt;
use std::sync::Arc;

use http::HeaderMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard, OnceCell};

use crate::error::{LoadError, SessionError, StoreError};
use crate::options::Options;
use crate::store::{Store, StoreSession, DEFAULT_FLASH_KEY};
use crate::value::Value;

struct State {
    record: StoreSession,
    written: bool,
    persisted: bool,
    response: HeaderMap,
}

impl State {
    fn needs_save(&self) -> bool {
        self.written || (self.record.is_new && !self.persisted)
    }
}

struct Inner {
    name: String,
    request: HeaderMap,
    store: Arc<dyn Store>,
    state: OnceCell<Mutex<State>>,
}

/// A lazily resolved session.
///
/// Cloning is cheap; clones share the same underlying state.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use http::HeaderMap;
/// use trellis_sessions::{MemoryStore, Session};
///
/// # tokio_test::block_on(async {
/// let session = Session::new("web", HeaderMap::new(), Arc::new(MemoryStore::new()));
///
/// session.set("user", "alice").await?;
/// assert_eq!(session.get("user").await?.and_then(|v| v.as_str().map(str::to_owned)), Some("alice".to_string()));
/// assert!(session.is_new().await?);
/// # Ok::<_, trellis_sessions::SessionError>(())
/// # }).unwrap();
/// ```
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    /// Binds a session named `name` to a request's headers and a store.
    pub fn new(name: impl Into<String>, request: HeaderMap, store: Arc<dyn Store>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                request,
                store,
                state: OnceCell::new(),
            }),
        }
    }

    /// Returns the session name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns true once the store has been consulted.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.inner.state.initialized()
    }

    /// Returns the store-assigned identifier.
    pub async fn id(&self) -> Result<String, SessionError> {
        Ok(self.state().await?.record.id.clone())
    }

    /// Returns the value stored under `key`.
    pub async fn get(&self, key: &str) -> Result<Option<Value>, SessionError> {
        Ok(self.state().await?.record.values.get(key).cloned())
    }

    /// Returns the value under `key` converted to `T`.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        self.get(key)
            .await?
            .map(|v| serde_json::from_value(v.into()))
            .transpose()
            .map_err(SessionError::from)
    }

    /// Stores `value` under `key`.
    pub async fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<(), SessionError> {
        let mut state = self.state().await?;
        state.record.values.insert(key.into(), value.into());
        state.written = true;
        Ok(())
    }

    /// Serialises `value` and stores it under `key`.
    pub async fn set_as<T: Serialize + ?Sized>(
        &self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), SessionError> {
        let value: Value = serde_json::to_value(value)?.into();
        self.set(key, value).await
    }

    /// Removes `key`.
    pub async fn delete(&self, key: &str) -> Result<(), SessionError> {
        let mut state = self.state().await?;
        state.record.values.remove(key);
        state.written = true;
        Ok(())
    }

    /// Removes every key, one at a time.
    pub async fn clear(&self) -> Result<(), SessionError> {
        let keys: Vec<String> = self.state().await?.record.values.keys().cloned().collect();
        for key in keys {
            self.delete(&key).await?;
        }
        Ok(())
    }

    /// Queues a flash message on the default queue.
    pub async fn add_flash(&self, value: impl Into<Value>) -> Result<(), SessionError> {
        self.add_flash_to(DEFAULT_FLASH_KEY, value).await
    }

    /// Queues a flash message on the queue `key`.
    pub async fn add_flash_to(&self, key: &str, value: impl Into<Value>) -> Result<(), SessionError> {
        let mut state = self.state().await?;
        state.record.add_flash(value.into(), key);
        state.written = true;
        Ok(())
    }

    /// Returns and consumes the default flash queue.
    pub async fn flashes(&self) -> Result<Vec<Value>, SessionError> {
        self.flashes_from(DEFAULT_FLASH_KEY).await
    }

    /// Returns and consumes the flash queue `key`.
    ///
    /// Marks the session written even when the queue was empty.
    pub async fn flashes_from(&self, key: &str) -> Result<Vec<Value>, SessionError> {
        let mut state = self.state().await?;
        state.written = true;
        Ok(state.record.take_flashes(key))
    }

    /// Replaces the cookie options used by the next save.
    pub async fn options(&self, options: Options) -> Result<(), SessionError> {
        self.state().await?.record.options = options;
        Ok(())
    }

    /// Persists the session if it was written or has never been saved.
    pub async fn save(&self) -> Result<(), SessionError> {
        let mut state = self.state().await?;
        if state.needs_save() {
            self.persist(&mut state)
                .await
                .map_err(|source| SessionError::Save {
                    name: self.inner.name.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Expires the session and saves it immediately.
    pub async fn destroy(&self) -> Result<(), SessionError> {
        {
            let mut state = self.state().await?;
            state.record.options.max_age = -1;
            state.written = true;
        }
        self.save().await
    }

    /// Alias of [`Session::destroy`] kept under its historical name.
    #[deprecated(note = "use `destroy`")]
    pub async fn destory(&self) -> Result<(), SessionError> {
        self.destroy().await
    }

    /// Returns true if the store created this session for this request.
    pub async fn is_new(&self) -> Result<bool, SessionError> {
        Ok(self.state().await?.record.is_new)
    }

    /// Returns the `Set-Cookie` headers produced by the last successful save.
    ///
    /// Empty if the session was never resolved.
    pub async fn response_headers(&self) -> HeaderMap {
        match self.inner.state.get() {
            Some(state) => state.lock().await.response.clone(),
            None => HeaderMap::new(),
        }
    }

    async fn state(&self) -> Result<MutexGuard<'_, State>, SessionError> {
        let state = self.inner.state.get_or_try_init(|| self.resolve()).await?;
        Ok(state.lock().await)
    }

    async fn resolve(&self) -> Result<Mutex<State>, SessionError> {
        let name = &self.inner.name;
        let (record, loaded) = match self.inner.store.get(&self.inner.request, name).await {
            Ok(record) => (record, true),
            Err(LoadError {
                partial: Some(record),
                source,
            }) => {
                tracing::warn!(session = %name, error = %source, "session store returned an error, continuing with partial session");
                (*record, false)
            }
            Err(LoadError {
                partial: None,
                source,
            }) => {
                return Err(SessionError::Load {
                    name: name.clone(),
                    source,
                })
            }
        };
        tracing::debug!(session = %name, id = %record.id, is_new = record.is_new, "session resolved");

        let mut state = State {
            record,
            written: false,
            persisted: false,
            response: HeaderMap::new(),
        };

        // A partial session waits for the save after the handler.
        if loaded && state.record.is_new {
            if let Err(error) = self.persist(&mut state).await {
                tracing::warn!(session = %name, error = %error, "failed to save new session");
            }
        }

        Ok(Mutex::new(state))
    }

    async fn persist(&self, state: &mut State) -> Result<(), StoreError> {
        let mut response = HeaderMap::new();
        self.inner
            .store
            .save(&self.inner.request, &mut response, &mut state.record)
            .await?;
        state.response = response;
        state.written = false;
        state.persisted = true;
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.inner.name)
            .field("resolved", &self.is_resolved())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        inner: MemoryStore,
        gets: AtomicUsize,
        saves: AtomicUsize,
        last_max_age: parking_lot::Mutex<Option<i64>>,
    }

    #[async_trait]
    impl Store for Counting {
        async fn get(&self, request: &HeaderMap, name: &str) -> Result<StoreSession, LoadError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(request, name).await
        }

        async fn save(
            &self,
            request: &HeaderMap,
            response: &mut HeaderMap,
            session: &mut StoreSession,
        ) -> Result<(), StoreError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.last_max_age.lock() = Some(session.options.max_age);
            self.inner.save(request, response, session).await
        }

        fn set_default_options(&self, options: Options) {
            self.inner.set_default_options(options);
        }
    }

    struct Broken;

    #[async_trait]
    impl Store for Broken {
        async fn get(&self, _request: &HeaderMap, _name: &str) -> Result<StoreSession, LoadError> {
            Err(LoadError::new(StoreError::Other("backend down".into())))
        }

        async fn save(
            &self,
            _request: &HeaderMap,
            _response: &mut HeaderMap,
            _session: &mut StoreSession,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        fn set_default_options(&self, _options: Options) {}
    }

    #[derive(Default)]
    struct Partial {
        saves: AtomicUsize,
    }

    #[async_trait]
    impl Store for Partial {
        async fn get(&self, _request: &HeaderMap, name: &str) -> Result<StoreSession, LoadError> {
            Err(LoadError::with_partial(
                StoreError::InvalidSignature,
                StoreSession::new("fresh", name),
            ))
        }

        async fn save(
            &self,
            _request: &HeaderMap,
            _response: &mut HeaderMap,
            _session: &mut StoreSession,
        ) -> Result<(), StoreError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn set_default_options(&self, _options: Options) {}
    }

    fn session(store: &Arc<Counting>) -> Session {
        Session::new("web", HeaderMap::new(), Arc::clone(store) as Arc<dyn Store>)
    }

    #[tokio::test]
    async fn test_resolution_is_lazy_and_happens_once() {
        let store = Arc::new(Counting::default());
        let s = session(&store);
        assert!(!s.is_resolved());
        assert_eq!(store.gets.load(Ordering::SeqCst), 0);

        s.id().await.unwrap();
        s.get("missing").await.unwrap();
        s.clone().set("a", 1).await.unwrap();

        assert!(s.is_resolved());
        assert_eq!(store.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_new_session_saved_once() {
        let store = Arc::new(Counting::default());
        let s = session(&store);

        assert!(s.is_new().await.unwrap());
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        assert!(!s.response_headers().await.is_empty());

        s.save().await.unwrap();
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        assert!(s.is_new().await.unwrap());
    }

    #[tokio::test]
    async fn test_mutation_forces_save() {
        let store = Arc::new(Counting::default());
        let s = session(&store);
        s.set("k", "v").await.unwrap();
        s.save().await.unwrap();
        assert_eq!(store.saves.load(Ordering::SeqCst), 2);

        s.save().await.unwrap();
        assert_eq!(store.saves.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let store = Arc::new(Counting::default());
        let s = session(&store);
        s.set("a", 1).await.unwrap();
        s.set("b", "two").await.unwrap();
        s.clear().await.unwrap();

        assert_eq!(s.get("a").await.unwrap(), None);
        assert_eq!(s.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_flashes_are_one_shot() {
        let store = Arc::new(Counting::default());
        let s = session(&store);
        s.add_flash("saved").await.unwrap();
        s.add_flash_to("errors", "oops").await.unwrap();

        assert_eq!(s.flashes().await.unwrap(), vec![Value::from("saved")]);
        assert!(s.flashes().await.unwrap().is_empty());
        assert_eq!(s.flashes_from("errors").await.unwrap(), vec![Value::from("oops")]);
    }

    #[tokio::test]
    async fn test_reading_empty_flashes_marks_written() {
        let store = Arc::new(Counting::default());
        let s = session(&store);
        s.id().await.unwrap();
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);

        assert!(s.flashes().await.unwrap().is_empty());
        s.save().await.unwrap();
        assert_eq!(store.saves.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_destroy_saves_with_negative_max_age() {
        let store = Arc::new(Counting::default());
        let s = session(&store);
        s.set("k", "v").await.unwrap();
        s.destroy().await.unwrap();

        assert_eq!(*store.last_max_age.lock(), Some(-1));
        assert!(store.inner.is_empty());
    }

    #[tokio::test]
    async fn test_typed_values() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Cart {
            items: Vec<String>,
            total: i64,
        }

        let store = Arc::new(Counting::default());
        let s = session(&store);
        let cart = Cart {
            items: vec!["tea".into()],
            total: 4,
        };
        s.set_as("cart", &cart).await.unwrap();

        assert_eq!(s.get_as::<Cart>("cart").await.unwrap(), Some(cart));
        assert!(s.get_as::<Cart>("none").await.unwrap().is_none());
        assert!(s.get_as::<u8>("cart").await.is_err());
    }

    #[tokio::test]
    async fn test_large_unsigned_values_keep_precision() {
        let store = Arc::new(Counting::default());
        let s = session(&store);
        s.set_as("n", &(u64::MAX - 1)).await.unwrap();

        assert_eq!(s.get("n").await.unwrap(), Some(Value::UInt(u64::MAX - 1)));
        assert_eq!(s.get_as::<u64>("n").await.unwrap(), Some(u64::MAX - 1));
    }

    #[tokio::test]
    async fn test_partial_session_is_saved_after_handler_only() {
        let store = Arc::new(Partial::default());
        let s = Session::new("web", HeaderMap::new(), Arc::clone(&store) as Arc<dyn Store>);

        assert_eq!(s.id().await.unwrap(), "fresh");
        assert!(s.is_new().await.unwrap());
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);

        s.save().await.unwrap();
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        s.save().await.unwrap();
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_load_failure_without_session_is_an_error() {
        let s = Session::new("web", HeaderMap::new(), Arc::new(Broken));
        let err = s.get("k").await.unwrap_err();
        assert!(matches!(err, SessionError::Load { ref name, .. } if name == "web"));
        assert!(!s.is_resolved());
        assert!(s.response_headers().await.is_empty());
    }
}
