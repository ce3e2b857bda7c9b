//! Dispatch table: routes inbound requests to providers by service path.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use courier_core::url::keys;
use courier_core::{Exception, Provider, Request, Response};
use dashmap::DashMap;
use futures_util::FutureExt;
use tracing::{debug, error};

/// Message recorded when a provider or filter panics mid-call.
pub const PANIC_MESSAGE: &str = "provider call panic";

// ---------------------------------------------------------------------------
// MessageHandler trait
// ---------------------------------------------------------------------------

/// Per-server request handler. The transport hands every decoded request to
/// `call` and writes back whatever response it returns.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Resets to an empty provider set.
    fn initialize(&self);

    /// Inserts or replaces the provider at `provider.path()`.
    fn add_provider(&self, provider: Arc<dyn Provider>);

    /// Removes the provider at `provider.path()` only if it is this same instance.
    fn rm_provider(&self, provider: &Arc<dyn Provider>);

    fn provider(&self, path: &str) -> Option<Arc<dyn Provider>>;

    /// Routes `request` and always produces a response.
    async fn call(&self, request: Request) -> Response;
}

// ---------------------------------------------------------------------------
// DispatchTable
// ---------------------------------------------------------------------------

/// Default [`MessageHandler`]: a concurrent path -> provider map.
///
/// Lookups happen on every request while writes only happen at deploy and
/// undeploy, so the map is a `DashMap` and the provider `Arc` is cloned out
/// before awaiting the call. No shard lock is held while a provider runs.
///
/// `call` is the single fault boundary of the request path: a panic anywhere
/// below it (provider or filter) is converted into a 500 response.
#[derive(Default)]
pub struct DispatchTable {
    providers: DashMap<String, Arc<dyn Provider>>,
}

impl DispatchTable {
    /// Creates an empty dispatch table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: DashMap::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Registered paths, unordered.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.providers.iter().map(|e| e.key().clone()).collect()
    }

    async fn dispatch(&self, request: Request) -> Response {
        let Some(provider) = self.provider(&request.service_name) else {
            error!(request = %request, "not found provider");
            let message = format!("not found provider for {}", request.service_name);
            return Response::exception(request.request_id, Exception::service(message));
        };

        let mut response = provider.call(request).await;
        let gzip_size = provider.url().int_param(keys::GZIP_SIZE, 0);
        response.rpc_context.gzip_size = usize::try_from(gzip_size).unwrap_or(0);
        response
    }
}

#[async_trait]
impl MessageHandler for DispatchTable {
    fn initialize(&self) {
        self.providers.clear();
    }

    fn add_provider(&self, provider: Arc<dyn Provider>) {
        let path = provider.path();
        debug!(path = %path, "provider added");
        self.providers.insert(path, provider);
    }

    fn rm_provider(&self, provider: &Arc<dyn Provider>) {
        let path = provider.path();
        let removed = self
            .providers
            .remove_if(&path, |_, current| Arc::ptr_eq(current, provider));
        if removed.is_some() {
            debug!(path = %path, "provider removed");
        } else {
            debug!(path = %path, "provider not removed: entry absent or replaced");
        }
    }

    fn provider(&self, path: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(path).map(|entry| entry.value().clone())
    }

    async fn call(&self, request: Request) -> Response {
        let request_id = request.request_id;
        let summary = request.to_string();

        match AssertUnwindSafe(self.dispatch(request)).catch_unwind().await {
            Ok(response) => response,
            Err(payload) => {
                error!(request = %summary, cause = %panic_cause(&*payload), "provider call panic");
                Response::exception(request_id, Exception::service(PANIC_MESSAGE))
            }
        }
    }
}

/// Best-effort text of a panic payload.
fn panic_cause(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text
    } else {
        "<non-string panic payload>"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
