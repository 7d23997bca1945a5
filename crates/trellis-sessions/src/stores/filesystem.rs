//! Filesystem-backed session store.
//!
//! Each session is one JSON file named `session_<id>` in the store
//! directory. The cookie carries the id and the time it was issued, signed
//! with HMAC-SHA256, so a client cannot point its cookie at a file it was
//! not given or keep using one past `max_age`.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use http::HeaderMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::cookie::cookie_value;
use crate::error::{LoadError, StoreError};
use crate::options::Options;
use crate::store::{append_cookie, Store, StoreSession};
use crate::value::Value;

use super::{expires_at, new_session_id, unix_now};

type HmacSha256 = Hmac<Sha256>;

const FILE_PREFIX: &str = "session_";

/// What goes into a session file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Record {
    #[serde(default)]
    values: BTreeMap<String, Value>,
    #[serde(default)]
    flashes: BTreeMap<String, Vec<Value>>,
    /// Unix seconds after which the file is stale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
}

impl Record {
    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Stores sessions as files under a directory.
///
/// With a positive `max_age` in the default options, cookies older than
/// `max_age` are rejected and stale files are removed when they are next
/// read or by [`FilesystemStore::cleanup`].
///
/// # Example
///
/// ```no_run
/// use trellis_sessions::stores::FilesystemStore;
///
/// let store = FilesystemStore::new("./runtime/sessions", b"change-me");
/// assert_eq!(store.directory().to_str(), Some("./runtime/sessions"));
/// ```
#[derive(Debug)]
pub struct FilesystemStore {
    directory: PathBuf,
    secret: Vec<u8>,
    defaults: RwLock<Options>,
}

impl FilesystemStore {
    /// Creates a store writing into `directory`, signing cookies with `secret`.
    ///
    /// The directory is created on first save.
    pub fn new(directory: impl Into<PathBuf>, secret: impl AsRef<[u8]>) -> Self {
        Self {
            directory: directory.into(),
            secret: secret.as_ref().to_vec(),
            defaults: RwLock::new(Options::default()),
        }
    }

    /// Returns the session directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Removes every session file whose expiry has passed.
    ///
    /// Returns how many files were removed. Files that cannot be read or
    /// parsed are left alone.
    pub async fn cleanup(&self) -> Result<usize, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let now = unix_now();
        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(id) = file_name.to_str().and_then(|n| n.strip_prefix(FILE_PREFIX)) else {
                continue;
            };
            let Ok(bytes) = tokio::fs::read(entry.path()).await else {
                continue;
            };
            let stale = serde_json::from_slice::<Record>(&bytes).is_ok_and(|record| record.is_expired(now));
            if stale {
                self.remove(id).await?;
                removed += 1;
            }
        }

        tracing::debug!(directory = %self.directory.display(), removed, "expired sessions cleaned up");
        Ok(removed)
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.directory.join(format!("{FILE_PREFIX}{id}"))
    }

    fn fresh(&self, name: &str) -> StoreSession {
        StoreSession::new(new_session_id(), name).with_options(self.defaults.read().clone())
    }

    fn mac(&self, name: &str, id: &str, issued: i64) -> Result<HmacSha256, StoreError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|e| StoreError::Other(e.to_string()))?;
        mac.update(name.as_bytes());
        mac.update(b"|");
        mac.update(id.as_bytes());
        mac.update(b"|");
        mac.update(issued.to_string().as_bytes());
        Ok(mac)
    }

    /// Builds the cookie value `<id>.<issued>.<signature>`.
    fn sign(&self, name: &str, id: &str, issued: i64) -> Result<String, StoreError> {
        let tag = URL_SAFE_NO_PAD.encode(self.mac(name, id, issued)?.finalize().into_bytes());
        Ok(format!("{id}.{issued}.{tag}"))
    }

    /// Checks the signature and returns the id and issue time.
    fn verify(&self, name: &str, cookie: &str) -> Result<(String, i64), StoreError> {
        let mut parts = cookie.splitn(3, '.');
        let (Some(id), Some(issued), Some(tag)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(StoreError::InvalidSignature);
        };
        let issued: i64 = issued.parse().map_err(|_| StoreError::InvalidSignature)?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|_| StoreError::InvalidSignature)?;

        self.mac(name, id, issued)?
            .verify_slice(&tag)
            .map_err(|_| StoreError::InvalidSignature)?;

        Ok((id.to_string(), issued))
    }

    async fn load(&self, id: &str, now: i64) -> Result<Record, StoreError> {
        let bytes = tokio::fs::read(self.path_for(id)).await?;
        let record: Record = serde_json::from_slice(&bytes)?;
        if record.is_expired(now) {
            self.remove(id).await?;
            return Err(StoreError::Expired);
        }
        Ok(record)
    }

    async fn remove(&self, id: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Store for FilesystemStore {
    async fn get(&self, request: &HeaderMap, name: &str) -> Result<StoreSession, LoadError> {
        let Some(cookie) = cookie_value(request, name) else {
            return Ok(self.fresh(name));
        };

        let (id, issued) = match self.verify(name, &cookie) {
            Ok(verified) => verified,
            Err(e) => return Err(LoadError::with_partial(e, self.fresh(name))),
        };

        let now = unix_now();
        let max_age = self.defaults.read().max_age;
        if max_age > 0 && now.saturating_sub(issued) > max_age {
            if let Err(e) = self.remove(&id).await {
                tracing::warn!(session = %name, error = %e, "failed to remove expired session file");
            }
            return Err(LoadError::with_partial(StoreError::Expired, self.fresh(name)));
        }

        match self.load(&id, now).await {
            Ok(record) => {
                let mut session = StoreSession::new(id, name).with_options(self.defaults.read().clone());
                session.values = record.values;
                session.flashes = record.flashes;
                session.is_new = false;
                Ok(session)
            }
            Err(e) => Err(LoadError::with_partial(e, self.fresh(name))),
        }
    }

    async fn save(
        &self,
        _request: &HeaderMap,
        response: &mut HeaderMap,
        session: &mut StoreSession,
    ) -> Result<(), StoreError> {
        if session.options.is_expired() {
            self.remove(&session.id).await?;
            return append_cookie(response, session, "");
        }

        let now = unix_now();
        let record = Record {
            values: session.values.clone(),
            flashes: session.flashes.clone(),
            expires_at: expires_at(session.options.max_age, now),
        };
        let path = self.path_for(&session.id);
        tokio::fs::create_dir_all(&self.directory).await?;
        tokio::fs::write(&path, serde_json::to_vec(&record)?).await?;
        tracing::debug!(session = %session.name, path = %path.display(), "session written");

        let signed = self.sign(&session.name, &session.id, now)?;
        append_cookie(response, session, &signed)
    }

    fn set_default_options(&self, options: Options) {
        *self.defaults.write() = options;
    }
}
