//! Server seam consumed by exporters, and the default server implementation.

use std::sync::Arc;

use courier_core::{Request, Response, Url};
use parking_lot::RwLock;

use super::dispatch::{DispatchTable, MessageHandler};
use super::extension::ExtensionFactory;

/// Default server protocol.
pub const COURIER: &str = "courier";
/// Server protocol for CGI-style gateways; served by the same implementation.
pub const CGI: &str = "cgi";
/// Name of the default message handler.
pub const DEFAULT_HANDLER: &str = "default";

/// A listening endpoint owning one dispatch table.
pub trait Server: Send + Sync {
    fn url(&self) -> Arc<Url>;

    /// The dispatch table requests are routed through.
    fn dispatch_table(&self) -> Arc<dyn MessageHandler>;

    fn set_message_handler(&self, handler: Arc<dyn MessageHandler>);
}

/// Default [`Server`]. Transport adapters decode a request and pass it to
/// [`RpcServer::handle`].
pub struct RpcServer {
    url: Arc<Url>,
    handler: RwLock<Arc<dyn MessageHandler>>,
}

impl RpcServer {
    /// Creates a server with an empty [`DispatchTable`].
    #[must_use]
    pub fn new(url: Arc<Url>) -> Self {
        Self {
            url,
            handler: RwLock::new(Arc::new(DispatchTable::new())),
        }
    }

    /// Entry point for the transport layer.
    pub async fn handle(&self, request: Request) -> Response {
        let handler = self.handler.read().clone();
        handler.call(request).await
    }
}

impl Server for RpcServer {
    fn url(&self) -> Arc<Url> {
        self.url.clone()
    }

    fn dispatch_table(&self) -> Arc<dyn MessageHandler> {
        self.handler.read().clone()
    }

    fn set_message_handler(&self, handler: Arc<dyn MessageHandler>) {
        *self.handler.write() = handler;
    }
}

/// Registers [`RpcServer`] under the built-in protocols.
pub fn register_default_servers(factory: &ExtensionFactory) {
    for protocol in [COURIER, CGI] {
        factory.register_server(protocol, |url| Arc::new(RpcServer::new(url)));
    }
}

/// Registers [`DispatchTable`] as the `default` message handler.
pub fn register_default_message_handlers(factory: &ExtensionFactory) {
    factory.register_message_handler(DEFAULT_HANDLER, || Arc::new(DispatchTable::new()));
}
