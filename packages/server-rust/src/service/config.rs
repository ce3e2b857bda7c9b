//! Server and context configuration.
//!
//! [`ServerConfig`] carries node-level settings with sensible defaults.
//! [`ContextConfig`] is the JSON form of a [`Context`]: named registry and
//! service urls given as strings.

use std::collections::BTreeMap;
use std::sync::Arc;

use courier_core::{Context, Url, UrlParseError};
use serde::Deserialize;

use super::extension::ExtensionFactory;
use super::server::{Server, DEFAULT_HANDLER};

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid url for {name:?}: {source}")]
    InvalidUrl {
        name: String,
        #[source]
        source: UrlParseError,
    },
    #[error("invalid configuration json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no server extension for protocol {0:?}")]
    UnknownServer(String),
    #[error("no message handler extension named {0:?}")]
    UnknownMessageHandler(String),
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Output format of the `fmt` layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `courier_server=debug`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// Node-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Unique identifier for this server node.
    pub node_id: String,
    /// Message handler extension installed on every server built from this config.
    pub message_handler: String,
    pub log: LogConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            node_id: String::new(),
            message_handler: DEFAULT_HANDLER.to_string(),
            log: LogConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parses a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] on malformed input.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds the server registered for `url.protocol` and installs a fresh,
    /// initialized instance of the configured message handler on it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownServer`] or
    /// [`ConfigError::UnknownMessageHandler`] when an extension is missing.
    pub fn build_server(
        &self,
        factory: &ExtensionFactory,
        url: Arc<Url>,
    ) -> Result<Arc<dyn Server>, ConfigError> {
        let protocol = url.protocol.clone();
        let server = factory
            .server(url)
            .ok_or(ConfigError::UnknownServer(protocol))?;
        let handler = factory
            .message_handler(&self.message_handler)
            .ok_or_else(|| ConfigError::UnknownMessageHandler(self.message_handler.clone()))?;
        handler.initialize();
        server.set_message_handler(handler);
        Ok(server)
    }
}

// ---------------------------------------------------------------------------
// ContextConfig
// ---------------------------------------------------------------------------

/// Serialized form of a [`Context`].
///
/// ```json
/// {
///   "application": "orders",
///   "registries": { "zk": "zookeeper://10.0.0.1:2181" },
///   "services": { "orders": "courier://0.0.0.0:8002/svc.Orders?registry=zk" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub application: String,
    pub registries: BTreeMap<String, String>,
    pub services: BTreeMap<String, String>,
}

impl ContextConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] on malformed input.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses every url and builds the [`Context`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] naming the first entry that fails
    /// to parse.
    pub fn into_context(self) -> Result<Context, ConfigError> {
        let mut context = Context::new(self.application);
        for (name, raw) in self.registries {
            let url = parse_url(&name, &raw)?;
            context = context.with_registry(name, url);
        }
        for (name, raw) in self.services {
            let url = parse_url(&name, &raw)?;
            context = context.with_service(name, url);
        }
        Ok(context)
    }
}

fn parse_url(name: &str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|source| ConfigError::InvalidUrl {
        name: name.to_string(),
        source,
    })
}
