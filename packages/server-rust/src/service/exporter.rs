//! Service export: publishes a provider to its registries and tracks whether
//! it should receive traffic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use courier_core::url::{keys, split_names};
use courier_core::{Context, Provider, Registry, Url, NODE_TYPE_SERVICE};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::extension::ExtensionFactory;
use super::filter::wrap_with_filters;
use super::server::Server;

/// Configuration errors from [`ServiceExporter::export`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    #[error("exporter already exported")]
    AlreadyExported,
    #[error("no provider for export")]
    NoProvider,
    #[error("registry not found in url {url}")]
    MissingRegistry { url: String },
}

#[derive(Default)]
struct ExportState {
    provider: Option<Arc<dyn Provider>>,
    url: Option<Arc<Url>>,
    server: Option<Arc<dyn Server>>,
    /// Registries that accepted the registration.
    registries: Vec<Arc<dyn Registry>>,
    exported: bool,
}

// ---------------------------------------------------------------------------
// ServiceExporter
// ---------------------------------------------------------------------------

/// Binds one provider to a server and its registries.
///
/// Every mutating operation takes the exporter's own lock, so `export`,
/// `unexport`, `available` and `unavailable` on one exporter are serialized
/// while exporters for different services never contend. The lock is held
/// across registry calls: a stalled registry stalls this exporter only.
///
/// Availability is independent of export state and can be toggled to drain a
/// service without deregistering it. It is stored in an atomic so the request
/// path can read it without touching the lock.
#[derive(Default)]
pub struct ServiceExporter {
    state: Mutex<ExportState>,
    available: AtomicBool,
}

impl ServiceExporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the provider to export. No validation is performed.
    pub async fn set_provider(&self, provider: Arc<dyn Provider>) {
        self.state.lock().await.provider = Some(provider);
    }

    /// Publishes the attached provider.
    ///
    /// Stamps `nodeType=service` on the provider url, then registers it with
    /// each registry named in its `registry` parameter. A name missing from
    /// `context`, a protocol without a registry extension, or a failed
    /// `register` call is logged and skipped; the export still succeeds with
    /// the registries that accepted it.
    ///
    /// # Errors
    ///
    /// - [`ExportError::AlreadyExported`] if currently exported.
    /// - [`ExportError::NoProvider`] if no provider is attached.
    /// - [`ExportError::MissingRegistry`] if the url names no registry. Nothing
    ///   is registered or modified in that case.
    pub async fn export(
        &self,
        server: Arc<dyn Server>,
        factory: &ExtensionFactory,
        context: &Context,
    ) -> Result<(), ExportError> {
        let mut state = self.state.lock().await;

        if state.exported {
            return Err(ExportError::AlreadyExported);
        }
        let Some(provider) = state.provider.clone() else {
            return Err(ExportError::NoProvider);
        };

        let current = provider.url();
        let Some(names) = current.param(keys::REGISTRY).map(split_names) else {
            let url = current.to_string();
            error!(url = %url, "registry not found");
            return Err(ExportError::MissingRegistry { url });
        };

        let mut stamped = (*current).clone();
        stamped.put_param(keys::NODE_TYPE, NODE_TYPE_SERVICE);
        let url = Arc::new(stamped);
        provider.set_url(url.clone());

        let mut registries = Vec::with_capacity(names.len());
        for name in &names {
            let Some(registry_url) = context.registry_url(name) else {
                error!(registry = %name, url = %url.identity(), "registry is invalid");
                continue;
            };
            let Some(registry) = factory.registry(&registry_url) else {
                error!(
                    registry = %name,
                    protocol = %registry_url.protocol,
                    "no registry extension for protocol"
                );
                continue;
            };
            match registry.register(&url).await {
                Ok(()) => registries.push(registry),
                Err(err) => {
                    warn!(registry = %name, url = %url.identity(), error = %err, "register failed");
                }
            }
        }

        info!(
            url = %url.identity(),
            requested = names.len(),
            registered = registries.len(),
            "export url success"
        );
        state.url = Some(url);
        state.server = Some(server);
        state.registries = registries;
        state.exported = true;
        self.available.store(true, Ordering::Release);
        Ok(())
    }

    /// Withdraws the service from every registry it was published to and
    /// removes the provider from the server's dispatch table.
    ///
    /// A no-op when not exported. Unregister failures are logged. The
    /// availability flag is left as is and the provider is not destroyed.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` mirrors [`ServiceExporter::export`].
    pub async fn unexport(&self) -> Result<(), ExportError> {
        let mut state = self.state.lock().await;
        if !state.exported {
            return Ok(());
        }

        let registries = std::mem::take(&mut state.registries);
        if let Some(url) = state.url.clone() {
            for registry in &registries {
                if let Err(err) = registry.unregister(&url).await {
                    warn!(
                        registry = %registry.url().identity(),
                        url = %url.identity(),
                        error = %err,
                        "unregister failed"
                    );
                }
            }
        }

        if let (Some(server), Some(provider)) = (&state.server, &state.provider) {
            server.dispatch_table().rm_provider(provider);
        }
        state.exported = false;

        if let Some(url) = &state.url {
            info!(url = %url.identity(), registries = registries.len(), "unexport url success");
        }
        Ok(())
    }

    /// Marks the service eligible for traffic.
    pub async fn available(&self) {
        let _state = self.state.lock().await;
        self.available.store(true, Ordering::Release);
    }

    /// Marks the service ineligible for traffic while staying registered.
    pub async fn unavailable(&self) {
        let _state = self.state.lock().await;
        self.available.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    pub async fn is_exported(&self) -> bool {
        self.state.lock().await.exported
    }

    pub async fn provider(&self) -> Option<Arc<dyn Provider>> {
        self.state.lock().await.provider.clone()
    }

    /// The url published at export time.
    pub async fn url(&self) -> Option<Arc<Url>> {
        self.state.lock().await.url.clone()
    }

    pub async fn set_url(&self, url: Arc<Url>) {
        self.state.lock().await.url = Some(url);
    }

    /// Registries the service is currently published to.
    pub async fn registries(&self) -> Vec<Arc<dyn Registry>> {
        self.state.lock().await.registries.clone()
    }
}

// ---------------------------------------------------------------------------
// publish
// ---------------------------------------------------------------------------

/// Runs the full deploy sequence for one provider: wrap it with its configured
/// filters, add it to the server's dispatch table, attach an exporter and
/// export.
///
/// A provider without a `registry` parameter is rejected before the dispatch
/// table is touched, so a failed redeploy never displaces the live provider at
/// the same path. If export still fails after the table was updated, the new
/// entry is removed and the provider it replaced is put back.
///
/// # Errors
///
/// Returns the [`ExportError`] from [`ServiceExporter::export`].
pub async fn publish(
    provider: Arc<dyn Provider>,
    server: Arc<dyn Server>,
    factory: &ExtensionFactory,
    context: &Context,
) -> Result<ServiceExporter, ExportError> {
    let url = provider.url();
    if url.param(keys::REGISTRY).is_none() {
        let url = url.to_string();
        error!(url = %url, "registry not found");
        return Err(ExportError::MissingRegistry { url });
    }

    let wrapped = wrap_with_filters(provider, factory, context);
    let table = server.dispatch_table();
    let replaced = table.provider(&wrapped.path());
    table.add_provider(wrapped.clone());

    let exporter = ServiceExporter::new();
    exporter.set_provider(wrapped.clone()).await;
    if let Err(err) = exporter.export(server.clone(), factory, context).await {
        table.rm_provider(&wrapped);
        if let Some(previous) = replaced {
            if table.provider(&previous.path()).is_none() {
                table.add_provider(previous);
            }
        }
        return Err(err);
    }
    Ok(exporter)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::AtomicU32;

    use async_trait::async_trait;
    use courier_core::{Request, ServiceHandler};
    use serde_json::json;
    use tokio::sync::Notify;

    use super::*;
    use crate::service::filter::ACCESS_LOG;
    use crate::service::provider::{DefaultProvider, FnHandler};
    use crate::service::server::RpcServer;

    /// In-memory registry counting calls.
    struct MockRegistry {
        url: Arc<Url>,
        registered: AtomicU32,
        unregistered: AtomicU32,
        reject: bool,
        /// When set, `register` waits for a notification first.
        gate: Option<Arc<Notify>>,
    }

    impl MockRegistry {
        fn new(host: &str) -> Arc<Self> {
            Self::build(host, false, None)
        }

        fn build(host: &str, reject: bool, gate: Option<Arc<Notify>>) -> Arc<Self> {
            Arc::new(Self {
                url: Arc::new(Url::new("mem", host, 2181, "")),
                registered: AtomicU32::new(0),
                unregistered: AtomicU32::new(0),
                reject,
                gate,
            })
        }

        fn registered(&self) -> u32 {
            self.registered.load(Ordering::SeqCst)
        }

        fn unregistered(&self) -> u32 {
            self.unregistered.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Registry for MockRegistry {
        fn url(&self) -> Arc<Url> {
            self.url.clone()
        }

        async fn register(&self, _url: &Url) -> anyhow::Result<()> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.registered.fetch_add(1, Ordering::SeqCst);
            if self.reject {
                anyhow::bail!("registry {} rejected registration", self.url.host);
            }
            Ok(())
        }

        async fn unregister(&self, _url: &Url) -> anyhow::Result<()> {
            self.unregistered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Harness {
        factory: Arc<ExtensionFactory>,
        context: Arc<Context>,
        server: Arc<dyn Server>,
        registries: HashMap<&'static str, Arc<MockRegistry>>,
    }

    impl Harness {
        /// Registries `a` and `b` resolve; `rejecting` resolves but refuses.
        fn new() -> Self {
            Self::with(vec![
                ("a", MockRegistry::new("a")),
                ("b", MockRegistry::new("b")),
                ("rejecting", MockRegistry::build("rejecting", true, None)),
            ])
        }

        fn with(registries: Vec<(&'static str, Arc<MockRegistry>)>) -> Self {
            let factory = ExtensionFactory::with_defaults();
            let mut context = Context::new("test-app");
            let mut by_host = HashMap::new();
            for (name, registry) in &registries {
                context = context.with_registry(*name, (*registry.url).clone());
                by_host.insert(registry.url.host.clone(), registry.clone());
            }
            factory.register_registry("mem", move |url| {
                let registry: Arc<dyn Registry> = by_host[&url.host].clone();
                registry
            });
            Self {
                factory: Arc::new(factory),
                context: Arc::new(context),
                server: Arc::new(RpcServer::new(Arc::new(Url::new("courier", "0.0.0.0", 8002, "")))),
                registries: registries.into_iter().collect(),
            }
        }

        fn registry(&self, name: &str) -> &MockRegistry {
            &self.registries[name]
        }

        fn total_registered(&self) -> u32 {
            self.registries.values().map(|r| r.registered()).sum()
        }

        async fn export(&self, exporter: &ServiceExporter) -> Result<(), ExportError> {
            exporter
                .export(self.server.clone(), &self.factory, &self.context)
                .await
        }
    }

    fn handler() -> Arc<dyn ServiceHandler> {
        Arc::new(FnHandler(|req: &Request| Ok(json!(format!("hello {}", req.method)))))
    }

    fn provider(params: &[(&str, &str)]) -> Arc<dyn Provider> {
        let mut url = Url::new("courier", "127.0.0.1", 8002, "svc.Greeter");
        for (k, v) in params {
            url.put_param(*k, *v);
        }
        Arc::new(DefaultProvider::with_service(url, handler()))
    }

    async fn exporter_for(provider: Arc<dyn Provider>) -> ServiceExporter {
        let exporter = ServiceExporter::new();
        exporter.set_provider(provider).await;
        exporter
    }

    #[tokio::test]
    async fn export_registers_and_marks_available() {
        let h = Harness::new();
        let p = provider(&[(keys::REGISTRY, "a, b")]);
        let exporter = exporter_for(p.clone()).await;

        h.export(&exporter).await.unwrap();

        assert!(exporter.is_exported().await);
        assert!(exporter.is_available());
        assert_eq!(exporter.registries().await.len(), 2);
        assert_eq!(h.registry("a").registered(), 1);
        assert_eq!(h.registry("b").registered(), 1);
    }

    #[tokio::test]
    async fn export_stamps_service_node_type() {
        let h = Harness::new();
        let p = provider(&[(keys::REGISTRY, "a")]);
        let exporter = exporter_for(p.clone()).await;

        h.export(&exporter).await.unwrap();

        assert_eq!(p.url().param(keys::NODE_TYPE), Some(NODE_TYPE_SERVICE));
        let published = exporter.url().await.unwrap();
        assert_eq!(published.param(keys::NODE_TYPE), Some(NODE_TYPE_SERVICE));
    }

    #[tokio::test]
    async fn second_export_fails_and_leaves_state() {
        let h = Harness::new();
        let exporter = exporter_for(provider(&[(keys::REGISTRY, "a,b")])).await;
        h.export(&exporter).await.unwrap();

        let err = h.export(&exporter).await.unwrap_err();

        assert_eq!(err, ExportError::AlreadyExported);
        assert!(exporter.is_exported().await);
        assert!(exporter.is_available());
        assert_eq!(exporter.registries().await.len(), 2);
        assert_eq!(h.registry("a").registered(), 1);
        assert_eq!(h.registry("b").registered(), 1);
    }

    #[tokio::test]
    async fn export_without_provider_fails_without_registry_calls() {
        let h = Harness::new();
        let exporter = ServiceExporter::new();

        let err = h.export(&exporter).await.unwrap_err();

        assert_eq!(err, ExportError::NoProvider);
        assert_eq!(h.total_registered(), 0);
        assert!(!exporter.is_exported().await);
    }

    #[tokio::test]
    async fn export_without_registry_param_fails_fast() {
        let h = Harness::new();
        let p = provider(&[]);
        let exporter = exporter_for(p.clone()).await;

        let err = h.export(&exporter).await.unwrap_err();

        assert!(matches!(err, ExportError::MissingRegistry { ref url } if url.contains("svc.Greeter")));
        assert_eq!(h.total_registered(), 0);
        assert!(!exporter.is_exported().await);
        assert!(!exporter.is_available());
        assert!(p.url().param(keys::NODE_TYPE).is_none());
    }

    #[tokio::test]
    async fn unresolvable_registry_is_skipped() {
        let h = Harness::new();
        let exporter = exporter_for(provider(&[(keys::REGISTRY, "a,missing")])).await;

        h.export(&exporter).await.unwrap();

        let registries = exporter.registries().await;
        assert_eq!(registries.len(), 1);
        assert_eq!(registries[0].url().host, "a");
        assert!(exporter.is_available());
    }

    #[tokio::test]
    async fn rejected_registration_is_not_recorded() {
        let h = Harness::new();
        let exporter = exporter_for(provider(&[(keys::REGISTRY, "rejecting,b")])).await;

        h.export(&exporter).await.unwrap();

        assert_eq!(h.registry("rejecting").registered(), 1);
        let registries = exporter.registries().await;
        assert_eq!(registries.len(), 1);
        assert_eq!(registries[0].url().host, "b");

        exporter.unexport().await.unwrap();
        assert_eq!(h.registry("rejecting").unregistered(), 0);
        assert_eq!(h.registry("b").unregistered(), 1);
    }

    #[tokio::test]
    async fn registry_with_unknown_protocol_is_skipped() {
        let h = Harness::new();
        let context = Context::new("x").with_registry("zk", Url::new("zookeeper", "zk1", 2181, ""));
        let exporter = exporter_for(provider(&[(keys::REGISTRY, "zk")])).await;

        exporter
            .export(h.server.clone(), &h.factory, &context)
            .await
            .unwrap();

        assert!(exporter.registries().await.is_empty());
        assert!(exporter.is_exported().await);
    }

    #[tokio::test]
    async fn unexport_unregisters_each_registry_once() {
        let h = Harness::new();
        let p = provider(&[(keys::REGISTRY, "a,b")]);
        h.server.dispatch_table().add_provider(p.clone());
        let exporter = exporter_for(p).await;
        h.export(&exporter).await.unwrap();

        exporter.unexport().await.unwrap();

        assert!(!exporter.is_exported().await);
        assert_eq!(h.registry("a").unregistered(), 1);
        assert_eq!(h.registry("b").unregistered(), 1);
        assert!(h.server.dispatch_table().provider("svc.Greeter").is_none());
        // Availability is not touched by unexport.
        assert!(exporter.is_available());

        exporter.unexport().await.unwrap();
        assert_eq!(h.registry("a").unregistered(), 1);
        assert_eq!(h.registry("b").unregistered(), 1);
    }

    #[tokio::test]
    async fn unexport_keeps_replacement_provider() {
        let h = Harness::new();
        let old = provider(&[(keys::REGISTRY, "a")]);
        h.server.dispatch_table().add_provider(old.clone());
        let exporter = exporter_for(old).await;
        h.export(&exporter).await.unwrap();

        let redeployed = provider(&[(keys::REGISTRY, "a")]);
        h.server.dispatch_table().add_provider(redeployed.clone());
        exporter.unexport().await.unwrap();

        let current = h.server.dispatch_table().provider("svc.Greeter").unwrap();
        assert!(Arc::ptr_eq(&current, &redeployed));
    }

    #[tokio::test]
    async fn unexport_without_export_is_noop() {
        let h = Harness::new();
        let exporter = exporter_for(provider(&[(keys::REGISTRY, "a")])).await;

        exporter.unexport().await.unwrap();

        assert_eq!(h.registry("a").unregistered(), 0);
        assert_eq!(h.total_registered(), 0);
    }

    #[tokio::test]
    async fn export_again_after_unexport() {
        let h = Harness::new();
        let exporter = exporter_for(provider(&[(keys::REGISTRY, "a")])).await;
        h.export(&exporter).await.unwrap();
        exporter.unexport().await.unwrap();

        h.export(&exporter).await.unwrap();

        assert!(exporter.is_exported().await);
        assert_eq!(h.registry("a").registered(), 2);
    }

    #[tokio::test]
    async fn availability_toggles_independently_of_export() {
        let h = Harness::new();
        let exporter = exporter_for(provider(&[(keys::REGISTRY, "a")])).await;
        assert!(!exporter.is_available());

        exporter.available().await;
        assert!(exporter.is_available());
        assert!(!exporter.is_exported().await);

        h.export(&exporter).await.unwrap();
        exporter.unavailable().await;
        assert!(!exporter.is_available());
        assert!(exporter.is_exported().await);
        assert_eq!(h.registry("a").unregistered(), 0);
    }

    #[tokio::test]
    async fn set_url_overrides_published_url() {
        let exporter = ServiceExporter::new();
        assert!(exporter.url().await.is_none());
        let url = Arc::new(Url::new("courier", "h", 1, "x"));
        exporter.set_url(url.clone()).await;
        assert_eq!(exporter.url().await, Some(url));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stalled_registry_does_not_block_other_exporters() {
        let gate = Arc::new(Notify::new());
        let h = Arc::new(Harness::with(vec![
            ("slow", MockRegistry::build("slow", false, Some(gate.clone()))),
            ("fast", MockRegistry::new("fast")),
        ]));

        let slow = Arc::new(exporter_for(provider(&[(keys::REGISTRY, "slow")])).await);
        let fast = exporter_for(provider(&[(keys::REGISTRY, "fast")])).await;

        let pending = {
            let h = h.clone();
            let slow = slow.clone();
            tokio::spawn(async move { h.export(&slow).await })
        };

        h.export(&fast).await.unwrap();
        assert!(fast.is_available());
        assert!(!slow.is_available());

        gate.notify_one();
        pending.await.unwrap().unwrap();
        assert!(slow.is_available());
        assert_eq!(h.registry("slow").registered(), 1);
    }

    #[tokio::test]
    async fn publish_serves_filtered_provider_until_unexport() {
        let h = Harness::new();
        let filters = format!("{ACCESS_LOG},metrics");
        let p = provider(&[(keys::REGISTRY, "a"), (keys::FILTER, filters.as_str()), (keys::GZIP_SIZE, "64")]);

        let exporter = publish(p.clone(), h.server.clone(), &h.factory, &h.context)
            .await
            .unwrap();

        let table = h.server.dispatch_table();
        let resp = table.call(Request::new(1, "svc.Greeter", "world")).await;
        assert_eq!(resp.value, Some(json!("hello world")));
        assert_eq!(resp.rpc_context.gzip_size, 64);
        assert_eq!(h.registry("a").registered(), 1);

        let attached = exporter.provider().await.unwrap();
        assert!(Arc::ptr_eq(&attached, &table.provider("svc.Greeter").unwrap()));

        exporter.unexport().await.unwrap();
        let resp = table.call(Request::new(2, "svc.Greeter", "world")).await;
        assert_eq!(resp.exception.unwrap().code, 500);
        // The provider itself stays usable.
        assert!(p.is_available());
    }

    #[tokio::test]
    async fn publish_without_registry_leaves_table_untouched() {
        let h = Harness::new();
        let Err(err) = publish(provider(&[]), h.server.clone(), &h.factory, &h.context).await
        else {
            panic!("publish without a registry parameter must fail");
        };

        assert!(matches!(err, ExportError::MissingRegistry { .. }));
        assert!(h.server.dispatch_table().provider("svc.Greeter").is_none());
    }

    #[tokio::test]
    async fn failed_redeploy_keeps_live_provider_serving() {
        let h = Harness::new();
        let live = publish(
            provider(&[(keys::REGISTRY, "a")]),
            h.server.clone(),
            &h.factory,
            &h.context,
        )
        .await
        .unwrap();
        let table = h.server.dispatch_table();
        let before = table.provider("svc.Greeter").unwrap();

        let redeploy = publish(provider(&[]), h.server.clone(), &h.factory, &h.context).await;
        assert!(matches!(redeploy, Err(ExportError::MissingRegistry { .. })));

        let after = table.provider("svc.Greeter").unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        let resp = table.call(Request::new(3, "svc.Greeter", "again")).await;
        assert_eq!(resp.value, Some(json!("hello again")));
        assert!(live.is_exported().await);
    }

    /// Provider whose url loses its `registry` parameter after the first read.
    struct RegistryDropping {
        reads: AtomicU32,
    }

    #[async_trait]
    impl Provider for RegistryDropping {
        fn url(&self) -> Arc<Url> {
            let url = Url::new("courier", "127.0.0.1", 8002, "svc.Greeter");
            if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
                Arc::new(url.with_param(keys::REGISTRY, "a"))
            } else {
                Arc::new(url)
            }
        }
        fn set_url(&self, _url: Arc<Url>) {}
        fn path(&self) -> String {
            "svc.Greeter".to_string()
        }
        fn is_available(&self) -> bool {
            true
        }
        fn destroy(&self) {}
        fn set_service(&self, _service: Arc<dyn ServiceHandler>) {}
        async fn call(&self, request: Request) -> courier_core::Response {
            courier_core::Response::value(request.request_id, json!("dropping"))
        }
    }

    #[tokio::test]
    async fn export_failure_after_table_update_restores_replaced_provider() {
        let h = Harness::new();
        let live = provider(&[(keys::REGISTRY, "a")]);
        h.server.dispatch_table().add_provider(live.clone());

        let flaky: Arc<dyn Provider> = Arc::new(RegistryDropping {
            reads: AtomicU32::new(0),
        });
        let result = publish(flaky, h.server.clone(), &h.factory, &h.context).await;
        assert!(matches!(result, Err(ExportError::MissingRegistry { .. })));

        let current = h.server.dispatch_table().provider("svc.Greeter").unwrap();
        assert!(Arc::ptr_eq(&current, &live));
    }

    // -----------------------------------------------------------------------
    // Log capture
    // -----------------------------------------------------------------------

    /// Collects every event as `field=value` text.
    #[derive(Clone, Default)]
    struct Captured(Arc<parking_lot::Mutex<Vec<String>>>);

    impl Captured {
        fn contains(&self, needles: &[&str]) -> bool {
            self.0
                .lock()
                .iter()
                .any(|line| needles.iter().all(|needle| line.contains(needle)))
        }
    }

    struct FieldText(String);

    impl tracing::field::Visit for FieldText {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            use std::fmt::Write;
            let _ = write!(self.0, "{}={:?} ", field.name(), value);
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for Captured {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let mut text = FieldText(format!("level={} ", event.metadata().level()));
            event.record(&mut text);
            self.0.lock().push(text.0);
        }
    }

    #[tokio::test]
    async fn unresolvable_registry_is_logged() {
        use tracing_subscriber::layer::SubscriberExt;

        let captured = Captured::default();
        let subscriber = tracing_subscriber::registry().with(captured.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let h = Harness::new();
        let exporter = exporter_for(provider(&[(keys::REGISTRY, "a,missing")])).await;
        h.export(&exporter).await.unwrap();

        assert!(captured.contains(&["level=ERROR", "registry is invalid", "registry=missing"]));
        assert!(!captured.contains(&["registry is invalid", "registry=a "]));
    }
}
