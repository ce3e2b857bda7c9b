//! Filter chain composition: wraps a provider with the filters named in its url.

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::url::keys;
use courier_core::{Context, EndpointFilter, Next, Provider, Request, Response, ServiceHandler, Url};
use tracing::{info, warn};

use crate::service::extension::ExtensionFactory;

/// Provider whose calls traverse an immutable filter chain before reaching
/// the real provider. Everything except `call` delegates to the inner provider.
pub struct FilteredProvider {
    provider: Arc<dyn Provider>,
    /// Outermost filter first.
    chain: Vec<Box<dyn EndpointFilter>>,
}

impl FilteredProvider {
    /// The real provider at the end of the chain.
    #[must_use]
    pub fn inner(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Filter names in execution order.
    #[must_use]
    pub fn filter_names(&self) -> Vec<&str> {
        self.chain.iter().map(|f| f.name()).collect()
    }

    /// Execution order for logs, e.g. `auth->metrics->provider`.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for name in self.filter_names() {
            out.push_str(name);
            out.push_str("->");
        }
        out.push_str("provider");
        out
    }
}

#[async_trait]
impl Provider for FilteredProvider {
    fn url(&self) -> Arc<Url> {
        self.provider.url()
    }

    fn set_url(&self, url: Arc<Url>) {
        self.provider.set_url(url);
    }

    fn path(&self) -> String {
        self.provider.path()
    }

    fn is_available(&self) -> bool {
        self.provider.is_available()
    }

    fn destroy(&self) {
        self.provider.destroy();
    }

    fn set_service(&self, service: Arc<dyn ServiceHandler>) {
        self.provider.set_service(service);
    }

    async fn call(&self, request: Request) -> Response {
        Next::new(&*self.provider, &self.chain).run(request).await
    }
}

/// Builds the filter chain configured on `provider`'s url.
///
/// Names are resolved in configuration order. Unknown names and filters
/// without the endpoint capability are skipped; composition never fails.
/// The chain is then reversed: the **last** configured filter is outermost,
/// so `filter=f1,f2,f3` executes `f3 -> f2 -> f1 -> provider`.
pub fn compose(
    provider: Arc<dyn Provider>,
    factory: &ExtensionFactory,
    context: &Context,
) -> FilteredProvider {
    let url = provider.url();
    let names = url.list_param(keys::FILTER);

    let mut chain: Vec<Box<dyn EndpointFilter>> = Vec::with_capacity(names.len());
    for name in &names {
        let Some(filter) = factory.filter(name, &url) else {
            warn!(filter = %name, url = %url.identity(), "filter not registered, skipped");
            continue;
        };
        let Some(mut endpoint) = filter.into_endpoint() else {
            warn!(filter = %name, url = %url.identity(), "not an endpoint filter, skipped");
            continue;
        };
        endpoint.set_context(context);
        chain.push(endpoint);
    }
    chain.reverse();

    let wrapped = FilteredProvider { provider, chain };
    info!(
        url = %url.identity(),
        configured = names.len(),
        active = wrapped.chain.len(),
        chain = %wrapped.describe(),
        "provider wrapped with filters"
    );
    wrapped
}

/// [`compose`], returned as a shareable provider.
pub fn wrap_with_filters(
    provider: Arc<dyn Provider>,
    factory: &ExtensionFactory,
    context: &Context,
) -> Arc<dyn Provider> {
    Arc::new(compose(provider, factory, context))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
