//! # Logging Bootstrap
//!
//! Tracing initialization for the orchestration core. Console output is
//! always enabled; when `CONGREGATE_LOG_DIR` is set, a daily-rolling JSON
//! file layer is added for the platform's log shipper to pick up.

use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static FILE_GUARD: OnceLock<Option<WorkerGuard>> = OnceLock::new();

/// Initialize tracing for the process. Safe to call repeatedly; only the
/// first call installs a subscriber.
pub fn init_structured_logging() {
    FILE_GUARD.get_or_init(|| {
        let filter = || {
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_level(&get_environment())))
        };

        let console_layer = fmt::layer().with_target(true).with_filter(filter());

        let (file_layer, guard) = match std::env::var("CONGREGATE_LOG_DIR") {
            Ok(log_dir) => {
                let appender = tracing_appender::rolling::daily(log_dir, "congregate-core.log");
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .json()
                    .with_filter(filter());
                (Some(layer), Some(guard))
            }
            Err(_) => (None, None),
        };

        let subscriber = tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer);

        // The host platform process may have installed a subscriber already
        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        // The guard must outlive the process for the non-blocking writer
        // to keep flushing
        guard
    });
}

/// Environment the process runs in; drives log-level defaults and
/// configuration override discovery
pub fn get_environment() -> String {
    std::env::var("CONGREGATE_ENV").unwrap_or_else(|_| "development".to_string())
}

fn default_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}
