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

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "pdfmaker_render_requests_total",
            Unit::Count,
            "Total render operations forwarded to the rendering API, by operation."
        );
        describe_counter!(
            "pdfmaker_render_failures_total",
            Unit::Count,
            "Total render operations the rendering API answered with an error, by operation."
        );
        describe_counter!(
            "pdfmaker_local_url_rejected_total",
            Unit::Count,
            "Total requests rejected because a URL pointed at a local development host."
        );
        describe_counter!(
            "pdfmaker_inline_delivery_failed_total",
            Unit::Count,
            "Total inline deliveries that fell back to the JSON descriptor because the artifact download failed."
        );
    });
}
