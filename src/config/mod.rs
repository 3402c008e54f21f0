//! Configuration module for otlpext
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion and validation.

use crate::telemetry::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_OTLP_ENDPOINT, DEFAULT_SERVICE_NAME, TRACER_NAME,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

// ============================================================================
// Environment Variable Expansion
// ============================================================================

fn env_var_pattern() -> &'static regex_lite::Regex {
    static PATTERN: OnceLock<regex_lite::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]+))?\}")
            .expect("env var pattern is a valid regex")
    })
}

/// Expand environment variables in a string.
///
/// Supports two syntaxes:
/// - `${VAR_NAME}` - Simple expansion, keeps placeholder if var not found
/// - `${VAR_NAME:-default}` - Expansion with default value
pub(crate) fn expand_env_vars(s: &str) -> String {
    let mut last_match = 0;
    let mut result = String::with_capacity(s.len());

    for cap in env_var_pattern().captures_iter(s) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };

        result.push_str(&s[last_match..full_match.start()]);

        let value = match std::env::var(var_name.as_str()) {
            Ok(val) => val,
            Err(_) => match cap.get(2) {
                Some(default) => default.as_str().to_string(),
                None => full_match.as_str().to_string(),
            },
        };
        result.push_str(&value);

        last_match = full_match.end();
    }

    result.push_str(&s[last_match..]);
    result
}

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate that a URL starts with http:// or https://
fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub load: LoadConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.telemetry.validate()?;
        self.load.validate()
    }
}

// ============================================================================
// Telemetry Configuration
// ============================================================================

/// OTLP export pipeline configuration.
///
/// # Example
///
/// ```yaml
/// telemetry:
///   endpoint: "${OTLP_ENDPOINT:-http://localhost:4317}"
///   service_name: "${SERVICENAME:-checkout}"
///   connect_timeout_millis: 1000
///   batch:
///     scheduled_delay_millis: 1000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Collector endpoint. Must start with http:// or https://.
    /// Supports ${VAR} and ${VAR:-default} expansion.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Reported as `service.name` on every span. Supports env expansion.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Upper bound on blocking while dialing the collector. Default: 1000
    #[serde(default = "default_connect_timeout_millis")]
    pub connect_timeout_millis: u64,

    /// Timeout for a single OTLP export call in seconds. Default: 10
    #[serde(default = "default_export_timeout_seconds")]
    pub export_timeout_seconds: u64,

    /// Batch span processor configuration
    #[serde(default)]
    pub batch: BatchConfig,
}

impl TelemetryConfig {
    /// Configuration for the given endpoint and service, defaults elsewhere.
    pub fn new(endpoint: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            service_name: service_name.into(),
            ..Self::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_millis)
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_secs(self.export_timeout_seconds)
    }

    /// Validate the telemetry section.
    ///
    /// Endpoint scheme problems are rejected here as well as at pipeline
    /// construction so a bad config file fails before anything starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_http_url(&self.endpoint) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid OTLP endpoint '{}': must start with http:// or https://",
                self.endpoint
            )));
        }

        if self.service_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Service name cannot be empty".into(),
            ));
        }

        if self.connect_timeout_millis == 0 {
            return Err(ConfigError::ValidationError(
                "connect_timeout_millis must be greater than zero".into(),
            ));
        }

        if self.export_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "export_timeout_seconds must be greater than zero".into(),
            ));
        }

        self.batch.validate()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            service_name: default_service_name(),
            connect_timeout_millis: default_connect_timeout_millis(),
            export_timeout_seconds: default_export_timeout_seconds(),
            batch: BatchConfig::default(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_OTLP_ENDPOINT.to_string()
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

fn default_connect_timeout_millis() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_millis() as u64
}

fn default_export_timeout_seconds() -> u64 {
    10
}

/// Batch span processor configuration.
///
/// The processor exports when either the queue fills past
/// `max_export_batch_size` or `scheduled_delay_millis` elapses.
///
/// # Example
///
/// ```yaml
/// batch:
///   max_queue_size: 2048
///   scheduled_delay_millis: 5000
///   max_export_batch_size: 512
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum number of spans to queue before dropping. Default: 2048
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    /// Delay in milliseconds between scheduled exports. Default: 5000
    #[serde(default = "default_scheduled_delay")]
    pub scheduled_delay_millis: u64,

    /// Maximum number of spans per export batch. Default: 512
    #[serde(default = "default_max_export_batch_size")]
    pub max_export_batch_size: usize,
}

impl BatchConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_queue_size == 0 || self.max_export_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "Batch queue and export sizes must be greater than zero".into(),
            ));
        }

        if self.max_export_batch_size > self.max_queue_size {
            return Err(ConfigError::ValidationError(format!(
                "max_export_batch_size ({}) cannot exceed max_queue_size ({})",
                self.max_export_batch_size, self.max_queue_size
            )));
        }

        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
            scheduled_delay_millis: default_scheduled_delay(),
            max_export_batch_size: default_max_export_batch_size(),
        }
    }
}

fn default_max_queue_size() -> usize {
    2048
}

fn default_scheduled_delay() -> u64 {
    5000
}

fn default_max_export_batch_size() -> usize {
    512
}

// ============================================================================
// Load Driver Configuration
// ============================================================================

/// Settings for the bundled load driver.
///
/// ```yaml
/// load:
///   virtual_users: 10
///   iterations: 100
///   span_name: "checkout"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Number of concurrent emitting threads. Default: 1
    #[serde(default = "default_virtual_users")]
    pub virtual_users: usize,

    /// Spans emitted by each virtual user. Default: 10
    #[serde(default = "default_iterations")]
    pub iterations: u64,

    /// Name given to every emitted span. Default: "bench"
    #[serde(default = "default_span_name")]
    pub span_name: String,
}

impl LoadConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.virtual_users == 0 {
            return Err(ConfigError::ValidationError(
                "virtual_users must be at least 1".into(),
            ));
        }

        if self.span_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "span_name cannot be empty".into(),
            ));
        }

        Ok(())
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            virtual_users: default_virtual_users(),
            iterations: default_iterations(),
            span_name: default_span_name(),
        }
    }
}

fn default_virtual_users() -> usize {
    1
}

fn default_iterations() -> u64 {
    10
}

fn default_span_name() -> String {
    TRACER_NAME.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_telemetry_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.endpoint, "http://localhost:4317");
        assert_eq!(config.connect_timeout(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_missing_scheme() {
        let config = TelemetryConfig::new("localhost:4317", "svc-a");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("http://"));
    }

    #[test]
    fn test_validation_rejects_blank_service_name() {
        let config = TelemetryConfig::new("http://localhost:4317", "   ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_oversized_batch() {
        let mut config = TelemetryConfig::default();
        config.batch.max_export_batch_size = config.batch.max_queue_size + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        let expanded = expand_env_vars("${OTLPEXT_UNSET_FOR_TEST:-http://collector:4317}");
        assert_eq!(expanded, "http://collector:4317");
    }

    #[test]
    fn test_expand_env_vars_keeps_unknown_placeholder() {
        let expanded = expand_env_vars("svc-${OTLPEXT_UNSET_PLACEHOLDER}");
        assert_eq!(expanded, "svc-${OTLPEXT_UNSET_PLACEHOLDER}");
    }

    #[test]
    fn test_default_service_name() {
        assert_eq!(TelemetryConfig::default().service_name, DEFAULT_SERVICE_NAME);
    }

    #[test]
    fn test_load_config_requires_a_user() {
        let config = Config {
            load: LoadConfig {
                virtual_users: 0,
                ..LoadConfig::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
