//! Metrics filter.
//!
//! Records call counts and durations through the `metrics` facade and wraps
//! every call in a `tracing` span. Without an installed recorder the metric
//! calls are no-ops.

use std::time::Instant;

use async_trait::async_trait;
use courier_core::{EndpointFilter, Filter, Next, Request, Response};
use tracing::{info_span, Instrument};

/// Registered name.
pub const METRICS: &str = "metrics";

/// Counter of completed calls, labelled by service and outcome.
pub const CALLS_TOTAL: &str = "courier_calls_total";
/// Histogram of call durations in seconds, labelled by service.
pub const CALL_DURATION: &str = "courier_call_duration_seconds";

#[derive(Debug, Clone, Default)]
pub struct MetricsFilter;

impl Filter for MetricsFilter {
    fn name(&self) -> &str {
        METRICS
    }

    fn into_endpoint(self: Box<Self>) -> Option<Box<dyn EndpointFilter>> {
        Some(self)
    }
}

#[async_trait]
impl EndpointFilter for MetricsFilter {
    async fn filter(&self, next: Next<'_>, request: Request) -> Response {
        let service = request.service_name.clone();
        let span = info_span!(
            "rpc_call",
            service = %service,
            method = %request.method,
            request_id = request.request_id,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        async move {
            let start = Instant::now();
            let response = next.run(request).await;
            let elapsed = start.elapsed();

            let outcome = if response.is_exception() { "exception" } else { "ok" };

            #[allow(clippy::cast_possible_truncation)]
            let duration_ms = elapsed.as_millis() as u64;
            tracing::Span::current().record("duration_ms", duration_ms);
            tracing::Span::current().record("outcome", outcome);

            ::metrics::counter!(CALLS_TOTAL, "service" => service.clone(), "outcome" => outcome)
                .increment(1);
            ::metrics::histogram!(CALL_DURATION, "service" => service).record(elapsed.as_secs_f64());

            response
        }
        .instrument(span)
        .await
    }
}
