//! Access log filter: one `info` line per call.

use std::time::Instant;

use async_trait::async_trait;
use courier_core::{Context, EndpointFilter, Filter, Next, Request, Response};
use tracing::info;

/// Registered name.
pub const ACCESS_LOG: &str = "accessLog";

#[derive(Debug, Clone, Default)]
pub struct AccessLogFilter {
    /// Injected from the context at composition time.
    application: String,
}

impl AccessLogFilter {
    #[must_use]
    pub fn application(&self) -> &str {
        &self.application
    }
}

impl Filter for AccessLogFilter {
    fn name(&self) -> &str {
        ACCESS_LOG
    }

    fn into_endpoint(self: Box<Self>) -> Option<Box<dyn EndpointFilter>> {
        Some(self)
    }
}

#[async_trait]
impl EndpointFilter for AccessLogFilter {
    fn set_context(&mut self, context: &Context) {
        self.application.clone_from(&context.application);
    }

    async fn filter(&self, next: Next<'_>, request: Request) -> Response {
        let start = Instant::now();
        let service = request.service_name.clone();
        let method = request.method.clone();
        let request_id = request.request_id;

        let response = next.run(request).await;

        let code = response.exception.as_ref().map_or(0, |e| e.code);
        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            target: "courier::access",
            application = %self.application,
            service = %service,
            method = %method,
            request_id,
            duration_ms,
            success = code == 0,
            code,
            "access"
        );
        response
    }
}
