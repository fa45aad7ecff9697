//! # CI Relay Service
//!
//! Binary entry point for the CI relay HTTP service.
//!
//! This executable:
//! - Loads configuration from environment and files
//! - Initializes logging
//! - Builds the shared state (event router, GitHub client, check manager)
//! - Starts the HTTP server from ci-relay-service

use ci_relay_service::config::RelayConfig;
use ci_relay_service::{build_state, start_server, ServiceError};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ci_relay_service=info,ci_relay_core=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CI Relay Service");

    // -------------------------------------------------------------------------
    // Load configuration
    //
    // Sources (applied in order — later sources override earlier ones):
    //  1. /etc/ci-relay/service.yaml          — system-wide defaults
    //  2. ./config/service.yaml               — deployment-local override
    //  3. Path given by CI_RELAY_CONFIG_FILE  — operator-specified file
    //  4. Environment variables prefixed CI_RELAY__ (double-underscore
    //     separator), e.g. CI_RELAY__SERVER__PORT=9090 sets server.port.
    //
    // Server, dispatch, and API-URL fields carry serde defaults; the app id,
    // private key, and webhook secret must be supplied or startup aborts.
    // -------------------------------------------------------------------------
    let mut config_builder = config::Config::builder()
        .add_source(
            config::File::with_name("/etc/ci-relay/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name("config/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    // Optional explicit path supplied by the operator.
    if let Ok(explicit_path) = std::env::var("CI_RELAY_CONFIG_FILE") {
        if !explicit_path.is_empty() {
            config_builder = config_builder.add_source(
                config::File::with_name(&explicit_path)
                    .required(true)
                    .format(config::FileFormat::Yaml),
            );
            info!(path = %explicit_path, "Loading configuration from explicit path");
        }
    }

    let config = match config_builder
        .add_source(config::Environment::with_prefix("CI_RELAY").separator("__"))
        .build()
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "Failed to build configuration; aborting");
            std::process::exit(3);
        }
    };

    let relay_config: RelayConfig = match config.try_deserialize() {
        Ok(rc) => rc,
        Err(e) => {
            error!(
                error = %e,
                "Could not deserialize service configuration; aborting. \
                 Fix the configuration and restart."
            );
            std::process::exit(3);
        }
    };

    // Decodes and validates the credential material before the server binds,
    // so a bad key fails here instead of on the first webhook.
    let state = match build_state(&relay_config) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Service configuration is invalid; aborting");
            std::process::exit(3);
        }
    };

    info!(
        host = %relay_config.server.host,
        port = relay_config.server.port,
        dispatch_repository = %relay_config.dispatch.repository,
        workflow = %relay_config.dispatch.workflow_file,
        "Starting HTTP server"
    );

    if let Err(e) = start_server(relay_config, state).await {
        error!("Failed to start server: {}", e);

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => 3,
        };

        std::process::exit(exit_code);
    }

    Ok(())
}
