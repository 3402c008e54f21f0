//! Collector endpoint handling

use super::TracingError;

const HTTP_SCHEME: &str = "http://";
const HTTPS_SCHEME: &str = "https://";

/// Strip the required scheme from a collector endpoint, leaving `host:port`.
///
/// The gRPC channel is always dialed in plaintext, so the scheme only
/// serves as a marker that the value is a URL and not something else.
///
/// # Errors
///
/// Returns [`TracingError::InvalidEndpoint`] when neither `http://` nor
/// `https://` is present. That error is fatal.
///
/// # Example
///
/// ```
/// use otlpext::telemetry::endpoint::strip_scheme;
///
/// assert_eq!(strip_scheme("https://collector:4317").unwrap(), "collector:4317");
/// assert!(strip_scheme("localhost:4317").is_err());
/// ```
pub fn strip_scheme(endpoint: &str) -> Result<&str, TracingError> {
    if let Some(authority) = endpoint.strip_prefix(HTTP_SCHEME) {
        Ok(authority)
    } else if let Some(authority) = endpoint.strip_prefix(HTTPS_SCHEME) {
        Ok(authority)
    } else {
        Err(TracingError::InvalidEndpoint(endpoint.to_string()))
    }
}
