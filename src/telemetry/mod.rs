//! OTLP trace export pipeline
//!
//! Lazily connects to an OTLP collector, installs a process-wide tracer
//! provider and emits named, instantaneous spans that are flushed to the
//! collector in the background.
//!
//! # Features
//!
//! - OTLP/gRPC export over a plaintext tonic channel
//! - At-most-once pipeline construction under concurrent callers
//! - Always-on sampling, batch span processing
//! - W3C Trace Context installed as the global propagator
//! - Lock-free span counter shared by all emitters
//!
//! # Example
//!
//! ```no_run
//! use otlpext::config::TelemetryConfig;
//! use otlpext::telemetry::TracerPipeline;
//!
//! let pipeline = TracerPipeline::new(TelemetryConfig::default());
//! pipeline.initialize("http://localhost:4317", "svc-a");
//!
//! let emitter = pipeline.emitter();
//! for name in ["op1", "op2", "op3"] {
//!     println!("{} sent", emitter.emit_span(name));
//! }
//! assert_eq!(pipeline.counter(), 3);
//!
//! pipeline.shutdown();
//! ```

use std::time::Duration;

pub mod connector;
pub mod emitter;
pub mod endpoint;
mod error;
pub mod pipeline;
pub mod resource;
pub mod subscriber;

pub use connector::{Connector, GrpcConnector};
pub use emitter::{SpanCounter, SpanEmitter};
pub use error::TracingError;
pub use pipeline::{PipelineState, TracerPipeline};
pub use subscriber::init_subscriber;

/// Collector endpoint used when none is configured.
pub const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";

/// Instrumentation scope of every emitted span.
pub const TRACER_NAME: &str = "bench";

/// Reported as `service.version` on every span.
pub const SERVICE_VERSION: &str = "0.0.1";

/// Reported as `service.name` when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "otlpext";

/// Upper bound on blocking while dialing the collector.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Trace id returned when no pipeline is ready.
pub const INVALID_TRACE_ID: &str = "00000000000000000000000000000000";
