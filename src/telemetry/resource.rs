use super::{TracingError, SERVICE_VERSION};
use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;

const SERVICE_NAME_KEY: &str = "service.name";
const SERVICE_VERSION_KEY: &str = "service.version";

/// Build the resource attached to every span: service name and version.
pub fn build_resource(service_name: &str) -> Result<Resource, TracingError> {
    let service_name = service_name.trim();
    if service_name.is_empty() {
        return Err(TracingError::ResourceBuild(
            "service name cannot be empty".into(),
        ));
    }
    if service_name.chars().any(char::is_control) {
        return Err(TracingError::ResourceBuild(format!(
            "service name {service_name:?} contains control characters"
        )));
    }

    Ok(Resource::new(vec![
        KeyValue::new(SERVICE_NAME_KEY, service_name.to_string()),
        KeyValue::new(SERVICE_VERSION_KEY, SERVICE_VERSION),
    ]))
}
