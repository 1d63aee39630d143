//! Layered configuration loading.
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. `/etc/review-gate/service.yaml`
//! 2. `./config/service.yaml`
//! 3. The file named by `RG_CONFIG_FILE`
//! 4. Environment variables prefixed `RG__`, with `__` between path segments,
//!    e.g. `RG__SERVER__PORT=9090` sets `server.port`
//!
//! Absent files are skipped. A file that exists but cannot be parsed, or a
//! value that cannot be coerced to its field type, is an error.

use review_gate_api::{ConfigError, ServiceConfig};
use std::collections::HashMap;

pub const CONFIG_FILE_VARIABLE: &str = "RG_CONFIG_FILE";

const SYSTEM_CONFIG: &str = "/etc/review-gate/service";
const LOCAL_CONFIG: &str = "config/service";

/// Load the service configuration.
///
/// `explicit_path` is the operator-supplied file and must exist when given.
/// `environment` replaces the process environment when set.
///
/// # Errors
///
/// Returns [`ConfigError::Load`] when a source cannot be read or the merged
/// result does not deserialize into [`ServiceConfig`].
pub fn load_config(
    explicit_path: Option<&str>,
    environment: Option<HashMap<String, String>>,
) -> Result<ServiceConfig, ConfigError> {
    let mut builder = config::Config::builder()
        .add_source(
            config::File::with_name(SYSTEM_CONFIG)
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name(LOCAL_CONFIG)
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    if let Some(path) = explicit_path.filter(|path| !path.is_empty()) {
        builder = builder.add_source(
            config::File::with_name(path)
                .required(true)
                .format(config::FileFormat::Yaml),
        );
    }

    let config = builder
        .add_source(
            config::Environment::with_prefix("RG")
                .separator("__")
                .source(environment),
        )
        .build()
        .map_err(|e| ConfigError::Load {
            message: e.to_string(),
        })?;

    config
        .try_deserialize::<ServiceConfig>()
        .map_err(|e| ConfigError::Load {
            message: e.to_string(),
        })
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
