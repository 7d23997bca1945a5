//! Bundled [`Store`](crate::Store) implementations.

mod filesystem;
mod memory;

pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;

/// Generates a fresh session identifier.
pub(crate) fn new_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Current time as Unix seconds.
pub(crate) fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Server-side expiry for a session saved at `now`, or `None` when
/// `max_age` leaves the lifetime to the browser.
pub(crate) fn expires_at(max_age: i64, now: i64) -> Option<i64> {
    (max_age > 0).then(|| now.saturating_add(max_age))
}
