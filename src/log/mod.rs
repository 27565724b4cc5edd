// tracing_setup.rs
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt};

/// Initialize tracing subscriber.
///
/// Behavior:
/// - Log level is read from `CHARGETAP_LOG_LEVEL` if set, otherwise falls back to `RUST_LOG`
///   (via try_from_default_env), then to `info`.
/// - Output format can be set via `CHARGETAP_LOG_FORMAT=json` to enable JSON output. Any other
///   value uses the default human-readable formatter.
/// - Everything is written to stderr; stdout is reserved for connector messages.
pub fn init_tracing() {
    let filter = match std::env::var("CHARGETAP_LOG_LEVEL") {
        Ok(lvl) => EnvFilter::new(lvl),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let use_json = std::env::var("CHARGETAP_LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let fmt_layer = if use_json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    let subscriber = Registry::default()
        .with(filter)
        .with(fmt_layer)
        .with(ErrorLayer::default());

    tracing::subscriber::set_global_default(subscriber)
        .expect("failed to set global tracing subscriber");
}
