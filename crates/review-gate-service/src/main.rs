//! # Review Gate Service
//!
//! Binary entry point for the Review Gate HTTP service.
//!
//! This executable:
//! - Loads layered configuration from files and environment
//! - Initializes structured logging
//! - Wires the ingestion pipeline collaborators
//! - Starts the HTTP server from review-gate-api
//!
//! Exit codes: `1` bind failure or startup failure, `2` server failure,
//! `3` configuration error.

mod settings;
mod wiring;

use review_gate_api::config::LoggingConfig;
use review_gate_api::{build_coordinator, start_server, AppState, ServiceError, ServiceMetrics};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let explicit_path = std::env::var(settings::CONFIG_FILE_VARIABLE).ok();
    let loaded = settings::load_config(explicit_path.as_deref(), None);

    // Configured logging when the configuration loaded, defaults otherwise.
    let logging = loaded
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging);

    info!("Starting Review Gate Service");

    let service_config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!(
                error = %e,
                "Could not load service configuration; aborting. \
                 Fix the configuration and restart."
            );
            std::process::exit(3);
        }
    };

    if let Some(path) = explicit_path.filter(|path| !path.is_empty()) {
        info!(path = %path, "Loaded configuration from explicit path");
    }

    if let Err(e) = service_config.validate() {
        error!(error = %e, "Service configuration is invalid; aborting");
        std::process::exit(3);
    }

    if let Err(e) = run(service_config).await {
        error!(error = %e, "Service stopped with an error");

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => 3,
            ServiceError::StartupFailed { .. } => 1,
        };

        std::process::exit(exit_code);
    }
}

async fn run(service_config: review_gate_api::ServiceConfig) -> Result<(), ServiceError> {
    let metrics = ServiceMetrics::new().map_err(|e| ServiceError::StartupFailed {
        message: format!("failed to initialize metrics: {}", e),
    })?;

    let components = wiring::build_components(&service_config)
        .await
        .map_err(|e| ServiceError::StartupFailed {
            message: format!("{:#}", e),
        })?;

    let coordinator = build_coordinator(&service_config, components, metrics.clone())?;

    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        endpoint = %service_config.webhooks.endpoint_path,
        "Starting HTTP server"
    );

    start_server(AppState::new(service_config, Arc::new(coordinator), metrics)).await
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "review_gate_service={level},review_gate_api={level},review_gate_core={level},tower_http=debug",
            level = logging.level
        ))
    });

    let json_layer = logging
        .json_format
        .then(|| tracing_subscriber::fmt::layer().json());
    let text_layer = (!logging.json_format).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}
