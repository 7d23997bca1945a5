//! Named route groups shared between boot callbacks.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// A shared map from group name to group handle.
///
/// Cloning produces another handle to the same map, which is how a group
/// callback publishes the groups it creates for later route callbacks.
///
/// # Example
///
/// ```
/// use trellis_boot::GroupRegistry;
///
/// let groups: GroupRegistry<&'static str> = GroupRegistry::new();
/// let writer = groups.clone();
/// writer.add("api", "/api");
///
/// assert_eq!(groups.get("api"), Some("/api"));
/// assert_eq!(groups.get("admin"), None);
/// ```
#[derive(Debug)]
pub struct GroupRegistry<G> {
    inner: Arc<RwLock<HashMap<String, G>>>,
}

impl<G: Clone> GroupRegistry<G> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Stores `group` under `name`. An existing entry is replaced.
    pub fn add(&self, name: impl Into<String>, group: G) {
        let name = name.into();
        if self.inner.write().insert(name.clone(), group).is_some() {
            tracing::debug!(group = %name, "replaced existing route group");
        }
    }

    /// Returns a clone of the group stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<G> {
        self.inner.read().get(name).cloned()
    }

    /// Returns true if a group is stored under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().contains_key(name)
    }

    /// Returns the registered group names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns true if no groups are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl<G: Clone> Default for GroupRegistry<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G> Clone for GroupRegistry<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
