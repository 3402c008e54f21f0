use thiserror::Error;

/// Errors that can occur while building or running the export pipeline
#[derive(Error, Debug)]
pub enum TracingError {
    #[error("Failed to create resource: {0}")]
    ResourceBuild(String),

    /// The configured endpoint has no `http://` or `https://` scheme.
    ///
    /// This is a deployment error rather than a transient one: callers must
    /// treat it as fatal and abort startup. See [`TracingError::is_fatal`].
    #[error("Invalid OTLP endpoint '{0}': endpoint must start with either http:// or https://")]
    InvalidEndpoint(String),

    #[error("Failed to create gRPC connection to collector at {address}: {reason}")]
    Connection { address: String, reason: String },

    #[error("Failed to create trace exporter: {0}")]
    ExporterInit(String),

    #[error("Failed to start export runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Failed to set global subscriber (may already be initialized): {0}")]
    Subscriber(String),
}

impl TracingError {
    /// Whether the error indicates misconfiguration that must stop the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TracingError::InvalidEndpoint(_))
    }
}
