//! Server-side request path.
//!
//! 1. **Extensions** (`extension`): name -> constructor maps for servers,
//!    message handlers, registries and filters
//! 2. **Filters** (`filter`): wraps a provider with the filters named in its url
//! 3. **Dispatch** (`dispatch`): routes inbound calls to providers by path and
//!    converts provider panics into exception responses
//! 4. **Export** (`exporter`): publishes a provider to its registries and
//!    tracks traffic eligibility
//! 5. **Servers** (`server`): the seam between transports and dispatch tables

pub mod config;
pub mod dispatch;
pub mod exporter;
pub mod extension;
pub mod filter;
pub mod provider;
pub mod server;

// Re-export key types for convenient access.
pub use config::{ConfigError, ContextConfig, LogConfig, LogFormat, ServerConfig};
pub use dispatch::{DispatchTable, MessageHandler, PANIC_MESSAGE};
pub use exporter::{publish, ExportError, ServiceExporter};
pub use extension::ExtensionFactory;
pub use filter::{register_default_filters, wrap_with_filters, FilteredProvider};
pub use provider::{DefaultProvider, FnHandler};
pub use server::{RpcServer, Server};
