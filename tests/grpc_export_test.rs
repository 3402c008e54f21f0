//! Export over OTLP/gRPC to an in-process collector
//!
//! Drives the production connector end to end: tonic dial, OTLP exporter
//! over the channel, batch processor on the pipeline's own runtime. The
//! collector runs on a separate runtime and forwards every request it
//! receives to the test thread.

use opentelemetry_proto::tonic::collector::trace::v1::{
    trace_service_server::{TraceService, TraceServiceServer},
    ExportTraceServiceRequest, ExportTraceServiceResponse,
};
use opentelemetry_proto::tonic::common::v1::any_value::Value;
use otlpext::config::TelemetryConfig;
use otlpext::telemetry::{PipelineState, TracerPipeline, INVALID_TRACE_ID};
use parking_lot::Mutex;
use serial_test::serial;
use std::net::SocketAddr;
use std::sync::mpsc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio_stream::wrappers::TcpListenerStream;

struct CollectorService {
    tx: Mutex<mpsc::Sender<ExportTraceServiceRequest>>,
}

#[tonic::async_trait]
impl TraceService for CollectorService {
    async fn export(
        &self,
        request: tonic::Request<ExportTraceServiceRequest>,
    ) -> Result<tonic::Response<ExportTraceServiceResponse>, tonic::Status> {
        let _ = self.tx.lock().send(request.into_inner());
        Ok(tonic::Response::new(ExportTraceServiceResponse {
            partial_success: None,
        }))
    }
}

/// Start a collector on an ephemeral loopback port.
fn start_collector() -> (Runtime, SocketAddr, mpsc::Receiver<ExportTraceServiceRequest>) {
    let rt = Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("Failed to build collector runtime");

    let listener = rt
        .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
        .expect("Failed to bind collector");
    let addr = listener.local_addr().expect("Failed to read collector address");

    let (tx, rx) = mpsc::channel();
    let service = TraceServiceServer::new(CollectorService { tx: Mutex::new(tx) });
    rt.spawn(async move {
        tonic::transport::Server::builder()
            .add_service(service)
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
    });

    (rt, addr, rx)
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[test]
#[serial]
fn test_grpc_pipeline_exports_span_to_collector() {
    let (collector, addr, requests) = start_collector();

    let mut config = TelemetryConfig::new(format!("http://{addr}"), "svc-grpc");
    config.batch.scheduled_delay_millis = 100;
    let pipeline = TracerPipeline::new(config);

    pipeline.ensure().expect("pipeline should connect to the local collector");
    assert_eq!(pipeline.state(), PipelineState::Ready);

    let trace_id = pipeline.send_trace("grpc-op");
    assert_eq!(trace_id.len(), 32);
    assert_ne!(trace_id, INVALID_TRACE_ID);

    pipeline.shutdown();
    assert_eq!(pipeline.state(), PipelineState::Shutdown);

    let request = requests
        .recv_timeout(Duration::from_secs(5))
        .expect("collector received no export");

    let resource_spans = &request.resource_spans[0];
    let service_name = resource_spans
        .resource
        .as_ref()
        .and_then(|resource| {
            resource
                .attributes
                .iter()
                .find(|kv| kv.key == "service.name")
        })
        .and_then(|kv| kv.value.as_ref())
        .and_then(|value| value.value.clone());
    assert_eq!(service_name, Some(Value::StringValue("svc-grpc".to_string())));

    let scope_spans = &resource_spans.scope_spans[0];
    assert_eq!(
        scope_spans.scope.as_ref().map(|scope| scope.name.as_str()),
        Some("bench")
    );

    let span = &scope_spans.spans[0];
    assert_eq!(span.name, "grpc-op");
    assert_eq!(to_hex(&span.trace_id), trace_id);

    collector.shutdown_background();
}
