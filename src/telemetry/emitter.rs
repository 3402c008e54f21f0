//! Span emission and the shared span counter

use super::TRACER_NAME;
use opentelemetry::global;
use opentelemetry::trace::{Span, Tracer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Count of span emission attempts.
///
/// Incremented once per started span with a lock-free atomic add. The most
/// recent value is mirrored into a separate field for external inspection;
/// the mirror only moves forward even when increments complete out of order.
#[derive(Debug, Default)]
pub struct SpanCounter {
    total: AtomicU64,
    last_observed: AtomicU64,
}

impl SpanCounter {
    /// Record one emission and return the new total.
    pub fn increment(&self) -> u64 {
        let value = self.total.fetch_add(1, Ordering::AcqRel) + 1;
        self.last_observed.fetch_max(value, Ordering::AcqRel);
        value
    }

    /// Current total.
    pub fn value(&self) -> u64 {
        self.total.load(Ordering::Acquire)
    }

    /// Mirrored value, as last published by [`SpanCounter::increment`].
    pub fn last_observed(&self) -> u64 {
        self.last_observed.load(Ordering::Acquire)
    }
}

/// Emits instantaneous spans through the globally registered tracer.
///
/// Cheap to clone; clones share the same counter.
#[derive(Debug, Clone)]
pub struct SpanEmitter {
    counter: Arc<SpanCounter>,
    scope: &'static str,
}

impl SpanEmitter {
    pub fn new(counter: Arc<SpanCounter>) -> Self {
        Self {
            counter,
            scope: TRACER_NAME,
        }
    }

    /// Start and immediately end a span named `name`.
    ///
    /// Returns the span's trace id as 32 lowercase hex characters. Never
    /// fails: when no pipeline is ready the global tracer is the no-op one
    /// and the returned id is all zeros. The span is handed to the batch
    /// processor; no network I/O happens on this call.
    pub fn emit_span(&self, name: &str) -> String {
        debug!(span_name = name, scope = self.scope, "Sending a span");

        let tracer = global::tracer(self.scope);
        let mut span = tracer.start(name.to_string());
        let count = self.counter.increment();
        let span_context = span.span_context().clone();
        span.end();

        debug!(
            trace_id = %span_context.trace_id(),
            span_id = %span_context.span_id(),
            count,
            "span emitted"
        );
        span_context.trace_id().to_string()
    }

    pub fn counter(&self) -> &SpanCounter {
        &self.counter
    }
}

impl Default for SpanEmitter {
    fn default() -> Self {
        Self::new(Arc::new(SpanCounter::default()))
    }
}
