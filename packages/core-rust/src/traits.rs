use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::Context;
use crate::message::{Exception, Request, Response};
use crate::url::Url;

/// Business-logic unit reachable through a dispatch table.
/// Wrappers (filter chains) implement this by delegating to an inner provider.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Current configuration. Swapped atomically by `set_url`.
    fn url(&self) -> Arc<Url>;

    fn set_url(&self, url: Arc<Url>);

    /// Dispatch key; unique within one dispatch table.
    fn path(&self) -> String;

    fn is_available(&self) -> bool;

    /// Releases the service object. Later calls are rejected.
    fn destroy(&self);

    /// Attaches the business object invoked by `call`.
    fn set_service(&self, service: Arc<dyn ServiceHandler>);

    /// Handles one request. Business failures are reported inside the response.
    async fn call(&self, request: Request) -> Response;
}

/// Business object behind a provider.
#[async_trait]
pub trait ServiceHandler: Send + Sync {
    async fn handle(&self, request: &Request) -> Result<Value, Exception>;
}

/// Naming/discovery endpoint a service is published to.
/// Implementations: zookeeper, consul, direct (external), in-memory (tests).
#[async_trait]
pub trait Registry: Send + Sync {
    fn url(&self) -> Arc<Url>;

    /// Publish `url` so clients can discover it.
    async fn register(&self, url: &Url) -> anyhow::Result<()>;

    /// Withdraw a previously published `url`.
    async fn unregister(&self, url: &Url) -> anyhow::Result<()>;
}

/// Any interceptor the extension factory can produce.
pub trait Filter: Send + Sync {
    fn name(&self) -> &str;

    /// Forwarding capability. Filters that cannot sit in front of a provider
    /// (e.g. client-side cluster filters) keep the default.
    fn into_endpoint(self: Box<Self>) -> Option<Box<dyn EndpointFilter>> {
        None
    }
}

/// Interceptor placed in front of a provider.
///
/// A filter receives the rest of the chain as [`Next`] and decides whether and
/// when to continue with `next.run(request)`. Returning without calling it
/// short-circuits the chain.
#[async_trait]
pub trait EndpointFilter: Filter {
    /// Called once at composition time, before the filter serves any call.
    fn set_context(&mut self, _context: &Context) {}

    async fn filter(&self, next: Next<'_>, request: Request) -> Response;
}

/// Cursor over the remaining filters of a chain, ending at the real provider.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    provider: &'a dyn Provider,
    chain: &'a [Box<dyn EndpointFilter>],
}

impl<'a> Next<'a> {
    /// `chain` is ordered outermost first.
    #[must_use]
    pub fn new(provider: &'a dyn Provider, chain: &'a [Box<dyn EndpointFilter>]) -> Self {
        Self { provider, chain }
    }

    /// The real provider at the end of the chain.
    #[must_use]
    pub fn provider(&self) -> &'a dyn Provider {
        self.provider
    }

    /// Filters still ahead of the provider.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }

    /// Runs the next filter, or the provider once the chain is exhausted.
    pub async fn run(self, request: Request) -> Response {
        match self.chain.split_first() {
            Some((head, rest)) => {
                head.filter(
                    Next {
                        provider: self.provider,
                        chain: rest,
                    },
                    request,
                )
                .await
            }
            None => self.provider.call(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    /// Call order shared between test filters and the provider.
    #[derive(Clone, Default)]
    struct Log(Arc<Mutex<Vec<String>>>);

    impl Log {
        fn push(&self, entry: impl Into<String>) {
            self.0.lock().unwrap().push(entry.into());
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct EchoProvider {
        url: Arc<Url>,
        log: Log,
    }

    #[async_trait]
    impl Provider for EchoProvider {
        fn url(&self) -> Arc<Url> {
            self.url.clone()
        }
        fn set_url(&self, _url: Arc<Url>) {}
        fn path(&self) -> String {
            self.url.path.clone()
        }
        fn is_available(&self) -> bool {
            true
        }
        fn destroy(&self) {}
        fn set_service(&self, _service: Arc<dyn ServiceHandler>) {}
        async fn call(&self, request: Request) -> Response {
            self.log.push("provider");
            Response::value(request.request_id, json!(request.method))
        }
    }

    struct Tag {
        name: &'static str,
        log: Log,
        short_circuit: bool,
    }

    impl Filter for Tag {
        fn name(&self) -> &str {
            self.name
        }
        fn into_endpoint(self: Box<Self>) -> Option<Box<dyn EndpointFilter>> {
            Some(self)
        }
    }

    #[async_trait]
    impl EndpointFilter for Tag {
        async fn filter(&self, next: Next<'_>, request: Request) -> Response {
            self.log.push(self.name);
            if self.short_circuit {
                return Response::exception(request.request_id, Exception::biz(403, "denied"));
            }
            next.run(request).await
        }
    }

    fn tag(name: &'static str, log: &Log, short_circuit: bool) -> Box<dyn EndpointFilter> {
        Box::new(Tag {
            name,
            log: log.clone(),
            short_circuit,
        })
    }

    fn provider(log: &Log) -> EchoProvider {
        EchoProvider {
            url: Arc::new(Url::new("courier", "h", 1, "svc")),
            log: log.clone(),
        }
    }

    #[tokio::test]
    async fn next_runs_chain_front_to_back_then_provider() {
        let log = Log::default();
        let provider = provider(&log);
        let chain = vec![tag("a", &log, false), tag("b", &log, false)];

        let resp = Next::new(&provider, &chain)
            .run(Request::new(1, "svc", "ping"))
            .await;

        assert_eq!(resp.value, Some(json!("ping")));
        assert_eq!(log.entries(), vec!["a", "b", "provider"]);
    }

    #[tokio::test]
    async fn empty_chain_calls_provider_directly() {
        let log = Log::default();
        let provider = provider(&log);
        let next = Next::new(&provider, &[]);
        assert_eq!(next.remaining(), 0);

        let resp = next.run(Request::new(2, "svc", "x")).await;
        assert_eq!(resp.request_id, 2);
        assert_eq!(log.entries(), vec!["provider"]);
    }

    #[tokio::test]
    async fn filter_can_short_circuit() {
        let log = Log::default();
        let provider = provider(&log);
        let chain = vec![tag("guard", &log, true), tag("inner", &log, false)];

        let resp = Next::new(&provider, &chain)
            .run(Request::new(3, "svc", "x"))
            .await;

        assert_eq!(resp.exception.unwrap().code, 403);
        assert_eq!(log.entries(), vec!["guard"]);
    }

    #[test]
    fn default_filter_has_no_forwarding_capability() {
        struct Cluster;
        impl Filter for Cluster {
            fn name(&self) -> &str {
                "cluster"
            }
        }
        assert!(Box::new(Cluster).into_endpoint().is_none());
    }
}
