//! Courier Server: service export, dispatch tables and provider filter chains.

pub mod service;
pub mod telemetry;

pub use service::{
    publish, ConfigError, ContextConfig, DispatchTable, ExportError, ExtensionFactory,
    MessageHandler, RpcServer, Server, ServerConfig, ServiceExporter,
};
pub use telemetry::init_tracing;
