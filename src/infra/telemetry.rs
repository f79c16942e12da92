//! Process-wide tracing subscriber and metric descriptions.

use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing::level_filters::LevelFilter;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Registry, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::counters;
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

static CACHE_COUNTERS_DESCRIBED: Once = Once::new();

/// Install the global subscriber for `logging`; fails if one is already set.
///
/// `RUST_LOG` directives refine the configured level.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_cache_counters();

    tracing_subscriber::registry()
        .with(output_layer(logging.format))
        .with(ErrorLayer::default())
        .with(level_filter(logging.level))
        .try_init()
        .map_err(|err| InfraError::telemetry(format!("tracing subscriber: {err}")))
}

fn level_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

fn output_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    }
}

fn describe_cache_counters() {
    CACHE_COUNTERS_DESCRIBED.call_once(|| {
        for (name, help) in counters::ALL {
            describe_counter!(name, Unit::Count, help);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_reports_existing_subscriber() {
        let settings = LoggingSettings {
            level: LevelFilter::WARN,
            format: LogFormat::Compact,
        };

        let _ = init(&settings);
        let err = init(&settings).expect_err("global subscriber is already installed");
        assert!(matches!(err, InfraError::Telemetry(_)));
    }
}
