use std::collections::HashMap;
use std::sync::Arc;

use crate::url::Url;

/// Process-wide configuration context consulted at export and composition time.
/// Resolves registry and service urls by the names used in url parameters.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Application name, stamped into logs and registry metadata.
    pub application: String,
    registry_urls: HashMap<String, Arc<Url>>,
    service_urls: HashMap<String, Arc<Url>>,
}

impl Context {
    #[must_use]
    pub fn new(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_registry(mut self, name: impl Into<String>, url: Url) -> Self {
        self.registry_urls.insert(name.into(), Arc::new(url));
        self
    }

    #[must_use]
    pub fn with_service(mut self, name: impl Into<String>, url: Url) -> Self {
        self.service_urls.insert(name.into(), Arc::new(url));
        self
    }

    /// Registry url configured under `name`.
    #[must_use]
    pub fn registry_url(&self, name: &str) -> Option<Arc<Url>> {
        self.registry_urls.get(name).cloned()
    }

    #[must_use]
    pub fn service_url(&self, name: &str) -> Option<Arc<Url>> {
        self.service_urls.get(name).cloned()
    }

    pub fn registry_names(&self) -> impl Iterator<Item = &str> {
        self.registry_urls.keys().map(String::as_str)
    }

    pub fn services(&self) -> impl Iterator<Item = (&str, &Arc<Url>)> {
        self.service_urls.iter().map(|(k, v)| (k.as_str(), v))
    }
}
