//! Endpoint identity plus an ordered parameter bag.
//!
//! A [`Url`] is the unit of configuration for every provider, registry and
//! server: the endpoint fields locate it, the parameters carry registry names,
//! filter names, node type and numeric tuning options.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

/// Well-known parameter keys.
pub mod keys {
    /// Comma-separated registry names the service is published to.
    pub const REGISTRY: &str = "registry";
    /// Node type marker; see [`super::NODE_TYPE_SERVICE`].
    pub const NODE_TYPE: &str = "nodeType";
    /// Comma-separated filter names wrapped around a provider.
    pub const FILTER: &str = "filter";
    /// Compression-size hint copied into every response.
    pub const GZIP_SIZE: &str = "gzipSize";
    /// Service group.
    pub const GROUP: &str = "group";
}

/// Node type stamped on a url when it is exported as a service.
pub const NODE_TYPE_SERVICE: &str = "service";

/// Node type of a client-side reference.
pub const NODE_TYPE_REFERER: &str = "referer";

/// Errors from parsing a url string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlParseError {
    #[error("missing protocol separator '://' in {0:?}")]
    MissingProtocol(String),
    #[error("empty protocol in {0:?}")]
    EmptyProtocol(String),
    #[error("invalid port {port:?} in {url:?}")]
    InvalidPort { url: String, port: String },
    #[error("invalid percent-encoding {component:?} in {url:?}")]
    InvalidEncoding { url: String, component: String },
}

/// Bytes escaped in query keys and values: separators plus anything that
/// would break the `k=v&k2=v2` layout.
const QUERY: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'=')
    .add(b'?');

/// Endpoint identity and parameter bag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Url {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub group: String,
    /// Ordered for deterministic rendering.
    pub parameters: BTreeMap<String, String>,
}

impl Url {
    /// Creates a url without parameters.
    #[must_use]
    pub fn new(
        protocol: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        path: impl Into<String>,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            host: host.into(),
            port,
            path: path.into(),
            group: String::new(),
            parameters: BTreeMap::new(),
        }
    }

    /// Builder-style parameter insertion.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.put_param(key, value);
        self
    }

    /// Builder-style group assignment.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Parameter value. [`keys::GROUP`] reads the `group` field.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        if key == keys::GROUP {
            return (!self.group.is_empty()).then_some(self.group.as_str());
        }
        self.parameters.get(key).map(String::as_str)
    }

    /// Sets a parameter. [`keys::GROUP`] is stored in the `group` field so it
    /// renders and parses back in one place.
    pub fn put_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if key == keys::GROUP {
            self.group = value.into();
        } else {
            self.parameters.insert(key, value.into());
        }
    }

    pub fn remove_param(&mut self, key: &str) -> Option<String> {
        if key == keys::GROUP {
            return Some(std::mem::take(&mut self.group)).filter(|g| !g.is_empty());
        }
        self.parameters.remove(key)
    }

    /// Integer parameter, falling back to `default` when absent or unparseable.
    #[must_use]
    pub fn int_param(&self, key: &str, default: i64) -> i64 {
        self.param(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Boolean parameter, falling back to `default` when absent or unparseable.
    #[must_use]
    pub fn bool_param(&self, key: &str, default: bool) -> bool {
        self.param(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Splits a comma-separated parameter into trimmed, non-empty names.
    #[must_use]
    pub fn list_param(&self, key: &str) -> Vec<String> {
        self.param(key).map(split_names).unwrap_or_default()
    }

    /// Stable identity used in logs and as a cache key.
    #[must_use]
    pub fn identity(&self) -> String {
        format!(
            "{}://{}:{}/{}?group={}",
            self.protocol, self.host, self.port, self.path, self.group
        )
    }
}

/// Splits on commas and drops empty segments.
#[must_use]
pub fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}/{}", self.protocol, self.host, self.port, self.path)?;
        let mut sep = '?';
        if !self.group.is_empty() {
            write!(f, "{sep}{}={}", keys::GROUP, utf8_percent_encode(&self.group, QUERY))?;
            sep = '&';
        }
        for (k, v) in &self.parameters {
            write!(
                f,
                "{sep}{}={}",
                utf8_percent_encode(k, QUERY),
                utf8_percent_encode(v, QUERY)
            )?;
            sep = '&';
        }
        Ok(())
    }
}

impl FromStr for Url {
    type Err = UrlParseError;

    /// Parses `protocol://host:port/path?k=v&k2=v2`. Port and path are optional.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (protocol, rest) = s
            .split_once("://")
            .ok_or_else(|| UrlParseError::MissingProtocol(s.to_string()))?;
        if protocol.is_empty() {
            return Err(UrlParseError::EmptyProtocol(s.to_string()));
        }

        let (location, query) = rest.split_once('?').unwrap_or((rest, ""));
        let (authority, path) = location.split_once('/').unwrap_or((location, ""));
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse().map_err(|_| UrlParseError::InvalidPort {
                    url: s.to_string(),
                    port: port.to_string(),
                })?;
                (host, port)
            }
            None => (authority, 0),
        };

        let mut url = Url::new(protocol, host, port, path);
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            url.put_param(decode(s, k)?, decode(s, v)?);
        }
        Ok(url)
    }
}

fn decode(url: &str, component: &str) -> Result<String, UrlParseError> {
    percent_decode_str(component)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .map_err(|_| UrlParseError::InvalidEncoding {
            url: url.to_string(),
            component: component.to_string(),
        })
}
