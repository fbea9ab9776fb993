use super::FilterConfig;
use crate::error::ConfigError;
use crate::resource::Registry;

/// Check that every resource type in `config` is supported by `registry`.
///
/// All unsupported types are reported together, sorted.
pub fn validate(config: &FilterConfig, registry: &Registry) -> Result<(), ConfigError> {
    let unsupported: Vec<String> = config
        .kinds()
        .filter(|kind| !registry.contains(kind))
        .map(str::to_string)
        .collect();

    if unsupported.is_empty() {
        return Ok(());
    }

    tracing::error!("Unsupported resource types in filter: {:?}", unsupported);
    Err(ConfigError::UnsupportedKind {
        kinds: unsupported,
    })
}
