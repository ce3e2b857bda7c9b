//! Courier Core: URLs, request/response model, and the provider, registry and filter contracts.

pub mod context;
pub mod message;
pub mod traits;
pub mod url;

pub use context::Context;
pub use message::{Exception, ExceptionKind, Request, Response, RpcContext};
pub use traits::{EndpointFilter, Filter, Next, Provider, Registry, ServiceHandler};
pub use url::{Url, UrlParseError, NODE_TYPE_REFERER, NODE_TYPE_SERVICE};
