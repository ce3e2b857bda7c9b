//! Name-keyed extension factory.
//!
//! Constructors for servers, message handlers, registries and filters are
//! registered once at process start and resolved by name (or url protocol)
//! when services are composed and exported.

use std::sync::Arc;

use courier_core::{Filter, Registry, Url};
use dashmap::DashMap;
use tracing::debug;

use super::dispatch::MessageHandler;
use super::filter::register_default_filters;
use super::server::{register_default_message_handlers, register_default_servers, Server};

pub type ServerConstructor = Arc<dyn Fn(Arc<Url>) -> Arc<dyn Server> + Send + Sync>;
pub type MessageHandlerConstructor = Arc<dyn Fn() -> Arc<dyn MessageHandler> + Send + Sync>;
pub type RegistryConstructor = Arc<dyn Fn(Arc<Url>) -> Arc<dyn Registry> + Send + Sync>;
pub type FilterConstructor = Arc<dyn Fn(&Url) -> Option<Box<dyn Filter>> + Send + Sync>;

// ---------------------------------------------------------------------------
// ExtensionFactory
// ---------------------------------------------------------------------------

/// Typed registry of extension constructors.
///
/// - **Servers** and **registries** are looked up by the url's protocol.
/// - **Message handlers** and **filters** are looked up by name.
///
/// Registry instances are cached per url identity so an exporter and a later
/// unexport talk to the same instance. Filters are constructed fresh on every
/// lookup because each chain owns its filters.
pub struct ExtensionFactory {
    servers: DashMap<String, ServerConstructor>,
    message_handlers: DashMap<String, MessageHandlerConstructor>,
    registries: DashMap<String, RegistryConstructor>,
    /// Cached registry instances: url identity -> instance.
    registry_instances: DashMap<String, Arc<dyn Registry>>,
    filters: DashMap<String, FilterConstructor>,
}

impl ExtensionFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            servers: DashMap::new(),
            message_handlers: DashMap::new(),
            registries: DashMap::new(),
            registry_instances: DashMap::new(),
            filters: DashMap::new(),
        }
    }

    /// Creates a factory with the built-in servers, message handler and filters.
    #[must_use]
    pub fn with_defaults() -> Self {
        let factory = Self::new();
        register_default_servers(&factory);
        register_default_message_handlers(&factory);
        register_default_filters(&factory);
        factory
    }

    pub fn register_server<F>(&self, protocol: &str, constructor: F)
    where
        F: Fn(Arc<Url>) -> Arc<dyn Server> + Send + Sync + 'static,
    {
        debug!(protocol, "registered server extension");
        self.servers.insert(protocol.to_string(), Arc::new(constructor));
    }

    pub fn register_message_handler<F>(&self, name: &str, constructor: F)
    where
        F: Fn() -> Arc<dyn MessageHandler> + Send + Sync + 'static,
    {
        debug!(name, "registered message handler extension");
        self.message_handlers
            .insert(name.to_string(), Arc::new(constructor));
    }

    pub fn register_registry<F>(&self, protocol: &str, constructor: F)
    where
        F: Fn(Arc<Url>) -> Arc<dyn Registry> + Send + Sync + 'static,
    {
        debug!(protocol, "registered registry extension");
        self.registries
            .insert(protocol.to_string(), Arc::new(constructor));
    }

    pub fn register_filter<F>(&self, name: &str, constructor: F)
    where
        F: Fn(&Url) -> Option<Box<dyn Filter>> + Send + Sync + 'static,
    {
        debug!(name, "registered filter extension");
        self.filters.insert(name.to_string(), Arc::new(constructor));
    }

    /// Builds a server for `url.protocol`.
    pub fn server(&self, url: Arc<Url>) -> Option<Arc<dyn Server>> {
        let constructor = self.servers.get(&url.protocol)?.value().clone();
        Some(constructor(url))
    }

    /// Builds a fresh message handler registered under `name`.
    pub fn message_handler(&self, name: &str) -> Option<Arc<dyn MessageHandler>> {
        let constructor = self.message_handlers.get(name)?.value().clone();
        Some(constructor())
    }

    /// Returns the registry for `url`, constructing and caching it on first use.
    pub fn registry(&self, url: &Arc<Url>) -> Option<Arc<dyn Registry>> {
        let key = url.identity();
        if let Some(existing) = self.registry_instances.get(&key) {
            return Some(existing.value().clone());
        }
        let constructor = self.registries.get(&url.protocol)?.value().clone();
        let registry = self
            .registry_instances
            .entry(key)
            .or_insert_with(|| constructor(url.clone()))
            .value()
            .clone();
        Some(registry)
    }

    /// Builds a fresh filter named `name`, bound to `url`.
    pub fn filter(&self, name: &str, url: &Url) -> Option<Box<dyn Filter>> {
        let constructor = self.filters.get(name)?.value().clone();
        constructor(url)
    }
}

impl Default for ExtensionFactory {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
