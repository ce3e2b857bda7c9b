//! Default provider: adapts a [`ServiceHandler`] to the [`Provider`] contract.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use courier_core::{Exception, Provider, Request, Response, ServiceHandler, Url};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::info;

/// Provider backed by a business object.
///
/// The url is held in an `ArcSwap` so readers on the request path never block
/// an exporter stamping it. Calls before a service is attached, or after
/// `destroy`, are answered with a 503 framework exception.
pub struct DefaultProvider {
    url: ArcSwap<Url>,
    service: RwLock<Option<Arc<dyn ServiceHandler>>>,
    destroyed: AtomicBool,
}

impl DefaultProvider {
    /// Creates a provider with no service attached.
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url: ArcSwap::from_pointee(url),
            service: RwLock::new(None),
            destroyed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_service(url: Url, service: Arc<dyn ServiceHandler>) -> Self {
        let provider = Self::new(url);
        provider.set_service(service);
        provider
    }
}

#[async_trait]
impl Provider for DefaultProvider {
    fn url(&self) -> Arc<Url> {
        self.url.load_full()
    }

    fn set_url(&self, url: Arc<Url>) {
        self.url.store(url);
    }

    fn path(&self) -> String {
        self.url.load().path.clone()
    }

    fn is_available(&self) -> bool {
        !self.destroyed.load(Ordering::Acquire) && self.service.read().is_some()
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
        self.service.write().take();
        info!(url = %self.url.load().identity(), "provider destroyed");
    }

    fn set_service(&self, service: Arc<dyn ServiceHandler>) {
        *self.service.write() = Some(service);
    }

    async fn call(&self, request: Request) -> Response {
        let start = Instant::now();
        let request_id = request.request_id;

        if self.destroyed.load(Ordering::Acquire) {
            return Response::exception(request_id, Exception::unavailable("provider destroyed"));
        }
        let service = self.service.read().clone();
        let Some(service) = service else {
            let message = format!("no service attached to {}", self.path());
            return Response::exception(request_id, Exception::unavailable(message));
        };

        let mut response = match service.handle(&request).await {
            Ok(value) => Response::value(request_id, value),
            Err(exception) => Response::exception(request_id, exception),
        };
        response.process_time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        response
    }
}

// ---------------------------------------------------------------------------
// FnHandler
// ---------------------------------------------------------------------------

/// [`ServiceHandler`] from a synchronous closure.
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> ServiceHandler for FnHandler<F>
where
    F: Fn(&Request) -> Result<Value, Exception> + Send + Sync,
{
    async fn handle(&self, request: &Request) -> Result<Value, Exception> {
        (self.0)(request)
    }
}
