//! Collector connection and exporter construction
//!
//! [`Connector`] splits pipeline construction into the two steps that talk
//! to the outside world: dialing the collector and wrapping the resulting
//! connection in a span exporter. [`GrpcConnector`] is the production
//! implementation (OTLP over plaintext gRPC via tonic).

use super::TracingError;
use async_trait::async_trait;
use opentelemetry_otlp::{SpanExporterBuilder, WithExportConfig};
use opentelemetry_sdk::export::trace::SpanExporter;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};

/// Dials a collector and builds span exporters on top of the connection.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open connection handed from [`Connector::connect`] to [`Connector::exporter`].
    type Connection: Send;

    /// Exporter fed by the batch span processor.
    type Exporter: SpanExporter + 'static;

    /// Open a connection to `authority` (`host:port`, scheme already removed).
    ///
    /// Resolves once the connection is established. The caller bounds this
    /// with the configured connect timeout.
    async fn connect(&self, authority: &str) -> Result<Self::Connection, TracingError>;

    /// Wrap an open connection in a span exporter.
    fn exporter(&self, connection: Self::Connection) -> Result<Self::Exporter, TracingError>;
}

/// OTLP/gRPC connector without transport security or authentication.
#[derive(Debug, Clone)]
pub struct GrpcConnector {
    export_timeout: Duration,
}

impl GrpcConnector {
    pub fn new(export_timeout: Duration) -> Self {
        Self { export_timeout }
    }
}

impl Default for GrpcConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl Connector for GrpcConnector {
    type Connection = Channel;
    type Exporter = opentelemetry_otlp::SpanExporter;

    async fn connect(&self, authority: &str) -> Result<Channel, TracingError> {
        let connection_error = |reason: String| TracingError::Connection {
            address: authority.to_string(),
            reason,
        };

        let endpoint = Endpoint::from_shared(format!("http://{authority}"))
            .map_err(|e| connection_error(e.to_string()))?
            .timeout(self.export_timeout);

        endpoint
            .connect()
            .await
            .map_err(|e| connection_error(e.to_string()))
    }

    fn exporter(&self, channel: Channel) -> Result<Self::Exporter, TracingError> {
        let builder = opentelemetry_otlp::new_exporter()
            .tonic()
            .with_channel(channel)
            .with_timeout(self.export_timeout);

        SpanExporterBuilder::from(builder)
            .build_span_exporter()
            .map_err(|e| TracingError::ExporterInit(e.to_string()))
    }
}
