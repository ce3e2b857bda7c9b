//! Request, response and structured exception types.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categorical exception type carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExceptionKind {
    /// Raised by the framework itself (codec, transport, missing handler).
    Framework,
    /// Raised while locating or running a service.
    Service,
    /// Raised deliberately by business logic.
    Biz,
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Framework => "framework",
            Self::Service => "service",
            Self::Biz => "biz",
        };
        f.write_str(name)
    }
}

/// Structured error returned to the remote caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind} exception {code}: {message}")]
pub struct Exception {
    pub code: i32,
    pub message: String,
    pub kind: ExceptionKind,
}

impl Exception {
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>, kind: ExceptionKind) -> Self {
        Self {
            code,
            message: message.into(),
            kind,
        }
    }

    /// A 500 `Service` exception, the shape used for routing failures and recovered faults.
    #[must_use]
    pub fn service(message: impl Into<String>) -> Self {
        Self::new(500, message, ExceptionKind::Service)
    }

    /// A 503 `Framework` exception.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(503, message, ExceptionKind::Framework)
    }

    /// A business exception raised by service code.
    #[must_use]
    pub fn biz(code: i32, message: impl Into<String>) -> Self {
        Self::new(code, message, ExceptionKind::Biz)
    }
}

/// Inbound call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub request_id: u64,
    /// Path of the target provider.
    pub service_name: String,
    pub method: String,
    pub method_desc: String,
    pub arguments: Vec<Value>,
    pub attachments: HashMap<String, String>,
}

impl Request {
    #[must_use]
    pub fn new(request_id: u64, service_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            request_id,
            service_name: service_name.into(),
            method: method.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_arguments(mut self, arguments: Vec<Value>) -> Self {
        self.arguments = arguments;
        self
    }

    #[must_use]
    pub fn attachment(&self, key: &str) -> Option<&str> {
        self.attachments.get(key).map(String::as_str)
    }
}

/// Short summary for log lines.
impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "req{{id={}, service={}, method={}({})}}",
            self.request_id, self.service_name, self.method, self.method_desc
        )
    }
}

/// Per-call response metadata that never reaches the business value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcContext {
    /// Bodies larger than this are compressed by the codec. 0 disables compression.
    pub gzip_size: usize,
}

/// Outbound reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub request_id: u64,
    pub value: Option<Value>,
    pub exception: Option<Exception>,
    pub process_time_ms: u64,
    pub attachments: HashMap<String, String>,
    #[serde(skip)]
    pub rpc_context: RpcContext,
}

impl Response {
    /// A successful response carrying `value`.
    #[must_use]
    pub fn value(request_id: u64, value: Value) -> Self {
        Self {
            request_id,
            value: Some(value),
            ..Self::default()
        }
    }

    /// A failed response carrying `exception`.
    #[must_use]
    pub fn exception(request_id: u64, exception: Exception) -> Self {
        Self {
            request_id,
            exception: Some(exception),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_exception(&self) -> bool {
        self.exception.is_some()
    }
}
