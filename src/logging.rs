//! # Structured Logging
//!
//! Environment-aware tracing setup. Idempotent: callers (binaries, test
//! harnesses, host applications) can invoke [`init_telemetry`] freely; only
//! the first call installs a subscriber.

use std::sync::OnceLock;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

static TELEMETRY_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Install a console tracing subscriber with an environment-appropriate
/// default level. `RUST_LOG` overrides everything.
pub fn init_telemetry() {
    TELEMETRY_INITIALIZED.get_or_init(|| {
        let environment = crate::config::detect_environment();
        let default_level = default_log_level(&environment);
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_filter(filter),
        );

        // A host application may already own the global subscriber
        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized");
        }
    });
}

fn default_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}
