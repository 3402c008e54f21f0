//! otlpext
//!
//! Minimal embeddable OpenTelemetry tracing client.
//!
//! # Features
//!
//! - **Lazy**: the collector connection is opened on first initialization
//! - **Once**: concurrent initializers construct the pipeline exactly once
//! - **Non-blocking emission**: spans are batched and exported in the background
//! - **Two-tier errors**: strict `ensure` or fire-and-forget `initialize`
//!
//! # Example
//!
//! ```no_run
//! use otlpext::{config::TelemetryConfig, telemetry::TracerPipeline};
//!
//! fn main() -> anyhow::Result<()> {
//!     let pipeline = TracerPipeline::new(TelemetryConfig::new("http://localhost:4317", "svc-a"));
//!     pipeline.ensure()?;
//!     println!("{}", pipeline.send_trace("op1"));
//!     pipeline.shutdown();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod load;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use telemetry::{SpanEmitter, TracerPipeline, TracingError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
