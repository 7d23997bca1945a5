//! Shared helpers for the session integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, Method};
use http_body_util::{BodyExt, Full};
use parking_lot::Mutex;
use trellis_middleware::{Request, Response};
use trellis_sessions::{LoadError, MemoryStore, Options, Store, StoreError, StoreSession};

pub fn get(path: &str, cookie: Option<&str>) -> Request {
    let mut builder = http::Request::builder().method(Method::GET).uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Full::new(Bytes::new())).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// All `Set-Cookie` headers, as sent.
pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// The `name=value` pairs of every `Set-Cookie`, joined for a `Cookie` header.
pub fn cookie_header(response: &Response) -> String {
    set_cookies(response)
        .iter()
        .map(|c| c.split(';').next().unwrap().to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Wraps a [`MemoryStore`] and counts calls.
#[derive(Debug, Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    gets: AtomicUsize,
    saves: AtomicUsize,
    saved_options: Mutex<Vec<Options>>,
}

impl CountingStore {
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn last_saved_options(&self) -> Option<Options> {
        self.saved_options.lock().last().cloned()
    }

    pub fn reset(&self) {
        self.gets.store(0, Ordering::SeqCst);
        self.saves.store(0, Ordering::SeqCst);
        self.saved_options.lock().clear();
    }
}

#[async_trait]
impl Store for CountingStore {
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
        self.saved_options.lock().push(session.options.clone());
        self.inner.save(request, response, session).await
    }

    fn set_default_options(&self, options: Options) {
        self.inner.set_default_options(options);
    }
}

/// Loads fine, never saves.
#[derive(Debug, Default)]
pub struct ReadOnlyStore {
    inner: MemoryStore,
}

#[async_trait]
impl Store for ReadOnlyStore {
    async fn get(&self, request: &HeaderMap, name: &str) -> Result<StoreSession, LoadError> {
        self.inner.get(request, name).await
    }

    async fn save(
        &self,
        _request: &HeaderMap,
        _response: &mut HeaderMap,
        _session: &mut StoreSession,
    ) -> Result<(), StoreError> {
        Err(StoreError::Other("store is read-only".to_string()))
    }

    fn set_default_options(&self, options: Options) {
        self.inner.set_default_options(options);
    }
}

/// Cannot produce a session at all.
#[derive(Debug, Default)]
pub struct UnavailableStore;

#[async_trait]
impl Store for UnavailableStore {
    async fn get(&self, _request: &HeaderMap, _name: &str) -> Result<StoreSession, LoadError> {
        Err(LoadError::new(StoreError::Other("connection refused".to_string())))
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
