//! The deferred registration ledger.
//!
//! Modules describe what they need from the server before the server
//! exists; [`Registry::init`] replays it against the real instance.
//!
//! Replay order is fixed, whatever order the calls were made in:
//!
//! 1. middleware callbacks
//! 2. group callbacks
//! 3. route callbacks (including [`Registry::group_by_name`] callbacks)
//!
//! Within each queue, registration order is execution order.

use crate::groups::GroupRegistry;

/// A callback replayed against the server handle.
pub type ServerCallback<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Deferred registrations for a server of type `S` with groups of type `G`.
///
/// # Example
///
/// ```
/// use trellis_boot::Registry;
///
/// #[derive(Default)]
/// struct Server {
///     log: Vec<&'static str>,
/// }
///
/// let mut registry: Registry<Server, ()> = Registry::new();
/// registry.route(|s| s.log.push("route"));
/// registry.middleware(|s| s.log.push("middleware"));
///
/// let mut server = Server::default();
/// registry.init(&mut server);
/// assert_eq!(server.log, vec!["middleware", "route"]);
/// ```
pub struct Registry<S, G> {
    groups: GroupRegistry<G>,
    middleware: Vec<ServerCallback<S>>,
    group_setup: Vec<ServerCallback<S>>,
    routes: Vec<ServerCallback<S>>,
}

impl<S, G> Registry<S, G>
where
    S: 'static,
    G: Clone + Send + Sync + 'static,
{
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            groups: GroupRegistry::new(),
            middleware: Vec::new(),
            group_setup: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// Returns a handle to the named group map.
    ///
    /// Group callbacks capture this handle to publish the groups they
    /// create.
    #[must_use]
    pub fn groups(&self) -> GroupRegistry<G> {
        self.groups.clone()
    }

    /// Stores a group handle under `name`, replacing any previous one.
    pub fn add_group(&self, name: impl Into<String>, group: G) {
        self.groups.add(name, group);
    }

    /// Returns the group stored under `name`, if any.
    #[must_use]
    pub fn get_group(&self, name: &str) -> Option<G> {
        self.groups.get(name)
    }

    /// Queues a middleware callback.
    pub fn middleware<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.middleware.push(Box::new(callback));
        self
    }

    /// Queues a group callback.
    pub fn group<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.group_setup.push(Box::new(callback));
        self
    }

    /// Queues a route callback.
    pub fn route<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.routes.push(Box::new(callback));
        self
    }

    /// Queues a route callback against the group named `group_name`.
    ///
    /// The group is looked up when the callback is replayed, so it may be
    /// added by a group callback that runs during the same `init`. If no
    /// such group exists at that point, a warning is logged and the
    /// callback is skipped.
    pub fn group_by_name<F>(&mut self, group_name: impl Into<String>, callback: F) -> &mut Self
    where
        F: FnOnce(&G) + Send + 'static,
    {
        let group_name = group_name.into();
        let groups = self.groups.clone();
        self.route(move |_server| match groups.get(&group_name) {
            Some(group) => callback(&group),
            None => {
                tracing::warn!(group = %group_name, "route group does not exist, skipping routes");
            }
        })
    }

    /// Number of queued middleware callbacks.
    #[must_use]
    pub fn middleware_count(&self) -> usize {
        self.middleware.len()
    }

    /// Number of queued group callbacks.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.group_setup.len()
    }

    /// Number of queued route callbacks.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Replays every queued callback against `server`.
    ///
    /// Consumes the registry, so registrations cannot be replayed twice.
    /// Returns the group map for lookups after startup.
    pub fn init(self, server: &mut S) -> GroupRegistry<G> {
        tracing::debug!(
            middleware = self.middleware.len(),
            groups = self.group_setup.len(),
            routes = self.routes.len(),
            "replaying boot registrations"
        );

        let Self {
            groups,
            middleware,
            group_setup,
            routes,
        } = self;

        for callback in middleware.into_iter().chain(group_setup).chain(routes) {
            callback(server);
        }

        groups
    }
}

impl<S, G> Default for Registry<S, G>
where
    S: 'static,
    G: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, G> std::fmt::Debug for Registry<S, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("middleware", &self.middleware.len())
            .field("groups", &self.group_setup.len())
            .field("routes", &self.routes.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Server {
        calls: Vec<String>,
    }

    type Log = Arc<Mutex<Vec<String>>>;

    #[test]
    fn test_replay_order_is_fixed() {
        let mut registry: Registry<Server, ()> = Registry::new();
        registry.route(|s| s.calls.push("A".into()));
        registry.middleware(|s| s.calls.push("B".into()));
        registry.route(|s| s.calls.push("C".into()));
        registry.middleware(|s| s.calls.push("D".into()));
        registry.group(|s| s.calls.push("G".into()));

        let mut server = Server::default();
        registry.init(&mut server);

        assert_eq!(server.calls, vec!["B", "D", "G", "A", "C"]);
    }

    #[test]
    fn test_nothing_runs_before_init() {
        let log: Log = Arc::default();
        let mut registry: Registry<Server, ()> = Registry::new();
        let seen = Arc::clone(&log);
        registry.middleware(move |_| seen.lock().unwrap().push("ran".into()));

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(registry.middleware_count(), 1);

        registry.init(&mut Server::default());
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_group_by_name_sees_groups_added_during_init() {
        let log: Log = Arc::default();
        let mut registry: Registry<Server, String> = Registry::new();

        let seen = Arc::clone(&log);
        registry.group_by_name("api", move |g: &String| seen.lock().unwrap().push(g.clone()));

        let groups = registry.groups();
        registry.group(move |_| groups.add("api", "/api/v1".to_string()));

        assert_eq!(registry.route_count(), 1);
        assert_eq!(registry.group_count(), 1);
        assert!(registry.get_group("api").is_none());

        let groups = registry.init(&mut Server::default());
        assert_eq!(*log.lock().unwrap(), vec!["/api/v1".to_string()]);
        assert_eq!(groups.get("api").as_deref(), Some("/api/v1"));
    }

    #[test]
    fn test_group_by_name_missing_group_is_skipped() {
        let log: Log = Arc::default();
        let mut registry: Registry<Server, String> = Registry::new();
        let seen = Arc::clone(&log);
        registry.group_by_name("ghost", move |_| seen.lock().unwrap().push("called".into()));
        registry.route(|s| s.calls.push("after".into()));

        let mut server = Server::default();
        registry.init(&mut server);

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(server.calls, vec!["after"]);
    }

    #[test]
    fn test_add_group_before_init() {
        let registry: Registry<Server, u32> = Registry::default();
        registry.add_group("v1", 1);
        registry.add_group("v1", 2);
        assert_eq!(registry.get_group("v1"), Some(2));
        assert_eq!(registry.get_group("v2"), None);
    }
}
