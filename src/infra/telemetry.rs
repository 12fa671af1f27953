//! Tracing subscriber and metric descriptions.

use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

/// Counters emitted by the page cache and session housekeeping.
const COUNTERS: [(&str, &str); 4] = [
    (
        "yatube_page_cache_hit_total",
        "Index pages replayed from the page cache.",
    ),
    (
        "yatube_page_cache_miss_total",
        "Index pages rendered because no fresh cache entry existed.",
    ),
    (
        "yatube_page_cache_evict_total",
        "Page cache entries dropped to stay within capacity.",
    ),
    (
        "yatube_sessions_purged_total",
        "Expired login sessions deleted at startup.",
    ),
];

static DESCRIBED: Once = Once::new();

/// Install the global subscriber. `RUST_LOG` directives win over the configured level.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    DESCRIBED.call_once(|| {
        for (name, help) in COUNTERS {
            describe_counter!(name, Unit::Count, help);
        }
    });

    tracing_subscriber::registry()
        .with(filter(logging))
        .with(ErrorLayer::default())
        .with(output_layer(logging.format))
        .try_init()
        .map_err(|err| InfraError::telemetry(err.to_string()))
}

fn filter(logging: &LoggingSettings) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy()
}

fn output_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    }
}
