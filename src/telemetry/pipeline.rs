//! Tracer provider lifecycle management
//!
//! [`TracerPipeline`] owns the one-time construction of the export pipeline:
//!
//! ```text
//! resource -> endpoint check -> connect -> exporter -> batch processor -> provider
//! ```
//!
//! Construction happens at most once per pipeline, however many threads race
//! on [`TracerPipeline::ensure`]. Once ready, the provider is installed as the
//! global OpenTelemetry tracer provider together with the W3C trace-context
//! propagator, and spans are emitted through [`SpanEmitter`] without ever
//! touching the construction lock.
//!
//! The pipeline drives the batch processor on a Tokio runtime it owns, so
//! `ensure`, `initialize` and `shutdown` must be called from synchronous
//! code, not from inside another async runtime.

use super::connector::{Connector, GrpcConnector};
use super::emitter::{SpanCounter, SpanEmitter};
use super::endpoint::strip_scheme;
use super::resource::build_resource;
use super::TracingError;
use crate::config::TelemetryConfig;
use opentelemetry::global;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::runtime;
use opentelemetry_sdk::trace::{self as sdktrace, BatchSpanProcessor, Sampler, TracerProvider};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder as RuntimeBuilder, Runtime};
use tracing::{debug, error, info, warn};

/// How long shutdown waits for the export runtime's tasks to wind down.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Observable lifecycle state of a [`TracerPipeline`].
///
/// Construction itself happens under the lock and is never observed by
/// other callers; they see either `Uninitialized` or `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    Ready,
    /// Terminal. The pipeline never returns to `Ready`.
    Shutdown,
}

struct PipelineInner {
    config: TelemetryConfig,
    state: PipelineState,
    provider: Option<TracerProvider>,
    runtime: Option<Runtime>,
}

/// Process-wide OTLP tracing pipeline.
///
/// Share it behind an [`Arc`]; all operations take `&self`.
///
/// # Example
///
/// ```no_run
/// use otlpext::config::TelemetryConfig;
/// use otlpext::telemetry::TracerPipeline;
///
/// let pipeline = TracerPipeline::new(TelemetryConfig::new("http://localhost:4317", "svc-a"));
/// pipeline.ensure()?;
///
/// let trace_id = pipeline.send_trace("checkout");
/// assert_eq!(trace_id.len(), 32);
///
/// pipeline.shutdown();
/// # Ok::<(), otlpext::telemetry::TracingError>(())
/// ```
pub struct TracerPipeline<C: Connector = GrpcConnector> {
    initialized: AtomicBool,
    connector: C,
    counter: Arc<SpanCounter>,
    inner: Mutex<PipelineInner>,
}

impl TracerPipeline<GrpcConnector> {
    /// Create an uninitialized pipeline exporting over OTLP/gRPC.
    pub fn new(config: TelemetryConfig) -> Self {
        let connector = GrpcConnector::new(config.export_timeout());
        Self::with_connector(config, connector)
    }
}

impl<C: Connector> TracerPipeline<C> {
    /// Create an uninitialized pipeline using a custom connector.
    pub fn with_connector(config: TelemetryConfig, connector: C) -> Self {
        Self {
            initialized: AtomicBool::new(false),
            connector,
            counter: Arc::new(SpanCounter::default()),
            inner: Mutex::new(PipelineInner {
                config,
                state: PipelineState::Uninitialized,
                provider: None,
                runtime: None,
            }),
        }
    }

    /// Store endpoint and service name, then build the pipeline.
    ///
    /// Errors are logged and discarded. On failure the pipeline stays
    /// uninitialized and emitted spans fall back to the no-op tracer. Use
    /// [`TracerPipeline::ensure`] to handle errors explicitly.
    pub fn initialize(&self, endpoint: &str, service_name: &str) {
        {
            let mut inner = self.inner.lock();
            if inner.state == PipelineState::Uninitialized {
                inner.config.endpoint = endpoint.to_string();
                inner.config.service_name = service_name.to_string();
            } else {
                debug!(
                    endpoint,
                    service_name, "pipeline already constructed, ignoring new settings"
                );
            }
        }

        if let Err(err) = self.ensure() {
            if err.is_fatal() {
                error!(error = %err, "fatal tracing misconfiguration, spans will not be exported");
            } else {
                error!(error = %err, "failed to initialize tracer");
            }
        }
    }

    /// Build the pipeline if it has not been built yet.
    ///
    /// Safe to call from any number of threads: exactly one caller performs
    /// construction, the rest either wait for it or return immediately.
    /// Re-invocation after success is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the failing construction step. [`TracingError::InvalidEndpoint`]
    /// is returned before any connection attempt and is fatal
    /// ([`TracingError::is_fatal`]): callers must abort startup on it.
    pub fn ensure(&self) -> Result<(), TracingError> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        let mut inner = self.inner.lock();

        // Another caller may have finished while we waited for the lock.
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        let (runtime, provider) = self.build(&inner.config)?;

        inner.provider = Some(provider);
        inner.runtime = Some(runtime);
        inner.state = PipelineState::Ready;
        self.initialized.store(true, Ordering::Release);

        info!(
            endpoint = %inner.config.endpoint,
            service_name = %inner.config.service_name,
            "Tracer initialized"
        );
        Ok(())
    }

    fn build(&self, config: &TelemetryConfig) -> Result<(Runtime, TracerProvider), TracingError> {
        let resource = build_resource(&config.service_name)?;
        let authority = strip_scheme(&config.endpoint)?;

        let rt = RuntimeBuilder::new_multi_thread()
            .worker_threads(1)
            .thread_name("otlpext-export")
            .enable_all()
            .build()?;

        let timeout = config.connect_timeout();
        debug!(authority, ?timeout, "connecting to collector");
        // The timer must be created inside the runtime, so build it in the async block.
        let connection = rt
            .block_on(async { tokio::time::timeout(timeout, self.connector.connect(authority)).await })
            .map_err(|_| TracingError::Connection {
                address: authority.to_string(),
                reason: format!("timed out after {timeout:?}"),
            })??;

        let provider = {
            // The batch processor spawns its worker and ticker on the current runtime.
            let _guard = rt.enter();

            let exporter = self.connector.exporter(connection)?;

            let batch_config = sdktrace::BatchConfig::default()
                .with_max_queue_size(config.batch.max_queue_size)
                .with_scheduled_delay(Duration::from_millis(config.batch.scheduled_delay_millis))
                .with_max_export_batch_size(config.batch.max_export_batch_size)
                .with_max_export_timeout(config.export_timeout());

            let processor = BatchSpanProcessor::builder(exporter, runtime::Tokio)
                .with_batch_config(batch_config)
                .build();

            TracerProvider::builder()
                .with_config(
                    sdktrace::config()
                        .with_sampler(Sampler::AlwaysOn)
                        .with_resource(resource),
                )
                .with_span_processor(processor)
                .build()
        };

        global::set_tracer_provider(provider.clone());
        global::set_text_map_propagator(TraceContextPropagator::new());

        Ok((rt, provider))
    }

    /// Flush buffered spans and release the pipeline.
    ///
    /// Blocks until the batch processor has exported what it holds or the
    /// SDK deadline passes. A no-op when the pipeline was never built or has
    /// already been shut down. Not meant to race with [`TracerPipeline::ensure`].
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock();

        let Some(provider) = inner.provider.take() else {
            debug!(state = ?inner.state, "no active tracer provider to shut down");
            return;
        };
        inner.state = PipelineState::Shutdown;

        for result in provider.force_flush() {
            if let Err(err) = result {
                warn!(error = %err, "failed to flush spans during shutdown");
            }
        }

        // Dropping the last provider handle shuts the batch processor down,
        // which in turn shuts the exporter and its channel.
        drop(provider);
        global::shutdown_tracer_provider();

        if let Some(rt) = inner.runtime.take() {
            rt.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
        }

        info!(spans = self.counter.value(), "Tracer shut down");
    }

    /// Whether construction has completed. Never resets.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn state(&self) -> PipelineState {
        self.inner.lock().state
    }

    /// Snapshot of the stored telemetry settings.
    pub fn config(&self) -> TelemetryConfig {
        self.inner.lock().config.clone()
    }

    /// Emitter sharing this pipeline's span counter.
    pub fn emitter(&self) -> SpanEmitter {
        SpanEmitter::new(Arc::clone(&self.counter))
    }

    /// Emit one instantaneous span and return its trace id.
    ///
    /// See [`SpanEmitter::emit_span`].
    pub fn send_trace(&self, span_name: &str) -> String {
        self.emitter().emit_span(span_name)
    }

    /// Last observed value of the shared span counter.
    pub fn counter(&self) -> u64 {
        self.counter.last_observed()
    }
}

impl<C: Connector> Drop for TracerPipeline<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<C: Connector> std::fmt::Debug for TracerPipeline<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracerPipeline")
            .field("initialized", &self.is_initialized())
            .field("counter", &self.counter.value())
            .finish_non_exhaustive()
    }
}
