//! otlpext - OTLP span load driver
//!
//! Connects to a collector once, emits spans from several concurrent
//! virtual users and flushes everything on exit.

use anyhow::Context;
use clap::Parser;
use otlpext::config::Config;
use otlpext::load::LoadRunner;
use otlpext::telemetry::{init_subscriber, TracerPipeline};
use std::path::PathBuf;
use tracing::{error, info};

/// otlpext - emit spans to an OTLP collector under concurrent load
#[derive(Parser, Debug)]
#[command(name = "otlpext")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Collector endpoint, must start with http:// or https://
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Service name attached to every span
    #[arg(short, long, env = "SERVICENAME")]
    service_name: Option<String>,

    /// Number of concurrent virtual users
    #[arg(short = 'u', long)]
    virtual_users: Option<usize>,

    /// Spans emitted per virtual user
    #[arg(short, long)]
    iterations: Option<u64>,

    /// Name of every emitted span
    #[arg(long)]
    span_name: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("failed to load configuration from {path:?}"))?,
            None => Config::default(),
        };

        if let Some(endpoint) = &self.endpoint {
            config.telemetry.endpoint = endpoint.clone();
        }
        if let Some(service_name) = &self.service_name {
            config.telemetry.service_name = service_name.clone();
        }
        if let Some(virtual_users) = self.virtual_users {
            config.load.virtual_users = virtual_users;
        }
        if let Some(iterations) = self.iterations {
            config.load.iterations = iterations;
        }
        if let Some(span_name) = &self.span_name {
            config.load.span_name = span_name.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_subscriber(&args.log_level, args.json)?;

    info!("Starting otlpext v{}", otlpext::VERSION);

    let config = args.resolve_config()?;

    info!("*** setup ***");
    let pipeline = TracerPipeline::new(config.telemetry.clone());
    if let Err(err) = pipeline.ensure() {
        if err.is_fatal() {
            return Err(err).context("refusing to start with a misconfigured collector endpoint");
        }
        error!(error = %err, "tracer unavailable, spans will not be exported");
    }

    let report = LoadRunner::new(pipeline.emitter(), &config.load).run();
    info!(
        "{} spans emitted by {} virtual users in {:?}",
        report.emitted, config.load.virtual_users, report.elapsed
    );

    info!("*** teardown ***");
    pipeline.shutdown();

    Ok(())
}
