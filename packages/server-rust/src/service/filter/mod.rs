//! Provider-side filters.
//!
//! - [`chain`]: composes the filters named in a provider url into a chain
//! - [`metrics`]: call counts and durations via the `metrics` facade
//! - [`access_log`]: one structured log line per call

pub mod access_log;
pub mod chain;
pub mod metrics;

use courier_core::Filter;

pub use access_log::{AccessLogFilter, ACCESS_LOG};
pub use chain::{compose, wrap_with_filters, FilteredProvider};
pub use metrics::{MetricsFilter, METRICS};

use super::extension::ExtensionFactory;

/// Registers the built-in filters.
pub fn register_default_filters(factory: &ExtensionFactory) {
    factory.register_filter(ACCESS_LOG, |_url| {
        Some(Box::new(AccessLogFilter::default()) as Box<dyn Filter>)
    });
    factory.register_filter(METRICS, |_url| Some(Box::new(MetricsFilter) as Box<dyn Filter>));
}
