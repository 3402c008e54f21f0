//! Log subscriber setup
//!
//! Installs a `tracing` subscriber for the crate's own diagnostics:
//!
//! ```text
//! Registry
//!   ├── EnvFilter (RUST_LOG, falling back to the given level)
//!   └── Fmt Layer (plain or JSON console output)
//! ```
//!
//! Spans emitted through [`SpanEmitter`](super::SpanEmitter) go to the OTLP
//! pipeline, not through this subscriber.

use super::TracingError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global log subscriber.
///
/// `RUST_LOG` takes precedence over `log_level` when set.
///
/// # Errors
///
/// Returns [`TracingError::Subscriber`] if a global subscriber is already set.
pub fn init_subscriber(log_level: &str, json: bool) -> Result<(), TracingError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
            .try_init()
    };

    result.map_err(|e| TracingError::Subscriber(e.to_string()))
}
