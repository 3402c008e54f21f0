//! Shared test doubles for pipeline tests
//!
//! - `RecordingExporter`: keeps every exported span and counts shutdowns
//! - `MockConnector`: counts connection attempts and can refuse, hang or
//!   fail exporter construction on demand

#![allow(dead_code)]

use async_trait::async_trait;
use futures::future::BoxFuture;
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use otlpext::config::TelemetryConfig;
use otlpext::telemetry::{Connector, TracerPipeline, TracingError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Span exporter that stores spans in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
    shutdowns: Arc<AtomicUsize>,
}

impl RecordingExporter {
    pub fn exported(&self) -> Vec<SpanData> {
        self.spans.lock().clone()
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl SpanExporter for RecordingExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        self.spans.lock().extend(batch);
        Box::pin(std::future::ready(Ok(())))
    }

    fn shutdown(&mut self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// How the mock collector responds to a dial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Accept,
    Refuse,
    Hang,
    BrokenExporter,
}

#[derive(Debug, Clone)]
pub struct MockConnector {
    behavior: Behavior,
    connect_delay: Duration,
    attempts: Arc<AtomicUsize>,
    authorities: Arc<Mutex<Vec<String>>>,
    exporter: RecordingExporter,
}

impl MockConnector {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            connect_delay: Duration::ZERO,
            attempts: Arc::new(AtomicUsize::new(0)),
            authorities: Arc::new(Mutex::new(Vec::new())),
            exporter: RecordingExporter::default(),
        }
    }

    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn authorities(&self) -> Vec<String> {
        self.authorities.lock().clone()
    }

    pub fn exporter(&self) -> RecordingExporter {
        self.exporter.clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Connection = ();
    type Exporter = RecordingExporter;

    async fn connect(&self, authority: &str) -> Result<(), TracingError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.authorities.lock().push(authority.to_string());

        match self.behavior {
            Behavior::Refuse => Err(TracingError::Connection {
                address: authority.to_string(),
                reason: "connection refused".to_string(),
            }),
            Behavior::Hang => std::future::pending().await,
            Behavior::Accept | Behavior::BrokenExporter => {
                tokio::time::sleep(self.connect_delay).await;
                Ok(())
            }
        }
    }

    fn exporter(&self, _connection: ()) -> Result<RecordingExporter, TracingError> {
        if self.behavior == Behavior::BrokenExporter {
            return Err(TracingError::ExporterInit("exporter rejected channel".into()));
        }
        Ok(self.exporter.clone())
    }
}

/// Pipeline wired to `connector`, with short timeouts for tests.
pub fn pipeline_with(endpoint: &str, connector: MockConnector) -> TracerPipeline<MockConnector> {
    let mut config = TelemetryConfig::new(endpoint, "svc-a");
    config.connect_timeout_millis = 200;
    config.batch.scheduled_delay_millis = 100;
    TracerPipeline::with_connector(config, connector)
}

/// Pipeline wired to a fresh mock connector; returns a handle to the mock too.
pub fn mock_pipeline(
    endpoint: &str,
    behavior: Behavior,
) -> (TracerPipeline<MockConnector>, MockConnector) {
    let connector = MockConnector::new(behavior);
    (pipeline_with(endpoint, connector.clone()), connector)
}

pub fn is_lower_hex_trace_id(id: &str) -> bool {
    id.len() == 32 && id.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}
