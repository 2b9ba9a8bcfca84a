//! Process-wide log subscriber setup for span-evals binaries.
//!
//! The filter comes from `SPAN_EVALS_LOG`, then `RUST_LOG`, then the level
//! passed by the caller. Only the first successful call installs a subscriber.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Env var consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "SPAN_EVALS_LOG";

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    /// Newline-delimited JSON.
    Json,
}

fn build_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing(format: LogFormat, level: Level) {
    let filter = build_filter(level);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_target(false)
                .with_writer(std::io::stderr);
            registry.with(layer).try_init()
        }
        LogFormat::Text => {
            let layer = fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr);
            registry.with(layer).try_init()
        }
    };

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
