//! # CI Relay Service
//!
//! HTTP surface of the CI relay. Three endpoints:
//! - `POST /webhook` — GitHub webhook deliveries: verify, parse, route.
//! - `POST /check` — create a check run for a commit.
//! - `PUT /check/{check_run_id}` — complete a check run with a conclusion.
//!
//! All shared dependencies (router, client, cache, token exchanger) are
//! constructed once in [`build_state`] and injected through axum state;
//! nothing in this crate is a process-wide singleton.

pub mod config;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{post, put};
use axum::Router;
use bytes::Bytes;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use ci_relay_core::auth::TokenExchanger;
use ci_relay_core::checks::{CheckConclusion, CheckRunManager};
use ci_relay_core::client::{default_http_client, GitHubClient, ResponseCache, DEFAULT_CACHE_CAPACITY};
use ci_relay_core::dispatch::{
    CheckSuiteRequestedHandler, InstallationCreatedHandler, PullRequestDispatchHandler,
};
use ci_relay_core::error::{ConfigError, HandlerError, ParseError, VerificationError};
use ci_relay_core::events::{EventRouter, PingPayload, WebhookEvent};
use ci_relay_core::webhook::SignatureValidator;
use ci_relay_core::InstallationId;

use crate::config::RelayConfig;

// ============================================================================
// Application State
// ============================================================================

/// Shared application state, injected into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Webhook signature verifier.
    pub verifier: Arc<SignatureValidator>,

    /// Event router with all handlers registered.
    pub router: Arc<EventRouter>,

    /// Check-run lifecycle manager.
    pub checks: Arc<CheckRunManager>,
}

/// Composition root: build the shared state from validated configuration.
///
/// One `GitHubClient`, one `ResponseCache`, and one `TokenExchanger` are
/// shared by every handler.
pub fn build_state(config: &RelayConfig) -> Result<AppState, ConfigError> {
    let credentials = config.credentials()?;

    let http = default_http_client("ci-relay")?;
    let cache = Arc::new(ResponseCache::new(DEFAULT_CACHE_CAPACITY));
    let client = Arc::new(GitHubClient::new(
        http.clone(),
        &config.github_api_url,
        cache,
    ));
    let exchanger = Arc::new(TokenExchanger::new(http, &config.github_api_url));

    let dispatch_handler = Arc::new(PullRequestDispatchHandler::new(
        client.clone(),
        exchanger.clone(),
        credentials.clone(),
        config.dispatch.clone(),
    ));

    let mut router = EventRouter::new();
    router.register("pull_request", "opened", dispatch_handler.clone());
    router.register("pull_request", "reopened", dispatch_handler);
    router.register(
        "installation",
        "created",
        Arc::new(InstallationCreatedHandler::new(
            client.clone(),
            exchanger.clone(),
            credentials.clone(),
        )),
    );
    router.register(
        "check_suite",
        "requested",
        Arc::new(CheckSuiteRequestedHandler),
    );

    let checks = Arc::new(CheckRunManager::new(client, exchanger, credentials));

    Ok(AppState {
        verifier: Arc::new(SignatureValidator::new(config.webhook_secret.as_str())),
        router: Arc::new(router),
        checks,
    })
}

/// Create the HTTP router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/check", post(handle_create_check))
        .route("/check/{check_run_id}", put(handle_update_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Request failure translation
// ============================================================================

/// Per-request failure, translated to an HTTP status in exactly one place.
///
/// Every variant maps to 500: a failed delivery must be visible to the
/// sender as a failure so GitHub records and can redeliver it.
#[derive(Debug, thiserror::Error)]
pub enum RequestFailure {
    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error("malformed request: {0}")]
    Parse(#[from] ParseError),

    #[error("request handling failed: {0}")]
    Handler(#[from] HandlerError),
}

impl IntoResponse for RequestFailure {
    fn into_response(self) -> Response {
        match &self {
            Self::Verification(_) => warn!("Rejected webhook with invalid signature"),
            Self::Parse(e) => warn!(error = %e, "Rejected malformed request"),
            Self::Handler(e) => error!(error = %e, "Request handling failed"),
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

// ============================================================================
// Webhook endpoint
// ============================================================================

fn required_header<'a>(
    headers: &'a HeaderMap,
    name: &'static str,
) -> Result<&'a str, ParseError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(ParseError::MissingHeader { header: name })
}

/// Handle a GitHub webhook delivery.
///
/// The request moves through a fixed sequence: verify the signature over the
/// raw bytes, parse the envelope, short-circuit `ping`, route to handlers.
/// Handler failures are logged but still acknowledged with 200; the delivery
/// itself succeeded, and GitHub redelivering an already-routed event would
/// double-dispatch CI.
async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, RequestFailure> {
    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok());

    if !state.verifier.verify(&body, signature) {
        return Err(VerificationError.into());
    }

    let event_type = required_header(&headers, "x-github-event")?;
    let delivery_id = required_header(&headers, "x-github-delivery")?;
    let event = WebhookEvent::from_http(event_type, delivery_id, &body)?;

    debug!(
        event_type = %event.event_type(),
        action = ?event.action(),
        delivery_id = %event.delivery_id(),
        "Verified and parsed webhook delivery"
    );

    if event.is_ping() {
        let zen = event
            .payload_as::<PingPayload>()
            .map(|ping| ping.zen)
            .unwrap_or_default();
        info!(delivery_id = %event.delivery_id(), zen = %zen, "Acknowledged ping");
        return Ok(StatusCode::OK);
    }

    let outcome = state.router.dispatch(&event).await;
    if outcome.is_clean() {
        info!(
            event_type = %event.event_type(),
            delivery_id = %event.delivery_id(),
            handled = outcome.handled,
            "Routed webhook delivery"
        );
    } else {
        for failure in &outcome.failures {
            error!(
                handler = failure.handler,
                error = %failure.error,
                delivery_id = %event.delivery_id(),
                "Webhook handler failed"
            );
        }
    }

    Ok(StatusCode::OK)
}

// ============================================================================
// Check endpoints
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateCheckRequest {
    owner: String,
    repo: String,
    check_name: String,
    installation_id: u64,
    head_sha: String,
}

#[derive(Debug, Deserialize)]
struct UpdateCheckRequest {
    installation_id: u64,
    owner: String,
    repo: String,
    conclusion: CheckConclusion,
}

fn decode_request<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, RequestFailure> {
    serde_json::from_slice(body).map_err(|e| {
        RequestFailure::Parse(ParseError::InvalidJson {
            message: e.to_string(),
        })
    })
}

/// Create a check run; responds with the new run's id as plain text.
async fn handle_create_check(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<String, RequestFailure> {
    let request: CreateCheckRequest = decode_request(&body)?;

    let id = state
        .checks
        .create(
            InstallationId::new(request.installation_id),
            &request.owner,
            &request.repo,
            &request.check_name,
            &request.head_sha,
        )
        .await?;

    Ok(id.to_string())
}

/// Complete a check run; responds with the updated run.
async fn handle_update_check(
    State(state): State<AppState>,
    Path(check_run_id): Path<u64>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, RequestFailure> {
    let request: UpdateCheckRequest = decode_request(&body)?;

    let run = state
        .checks
        .update(
            InstallationId::new(request.installation_id),
            &request.owner,
            &request.repo,
            check_run_id,
            request.conclusion,
        )
        .await?;

    Ok(Json(serde_json::json!({ "check_run": run })))
}

// ============================================================================
// Server lifecycle
// ============================================================================

/// Service-level errors.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Start the HTTP server and serve until shutdown.
pub async fn start_server(config: RelayConfig, state: AppState) -> Result<(), ServiceError> {
    let app = create_router(state);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let addr: SocketAddr = address.parse().map_err(|e: std::net::AddrParseError| {
        ServiceError::Configuration(ConfigError::InvalidValue {
            field: "server".to_string(),
            message: e.to_string(),
        })
    })?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    info!("Starting HTTP server on {}", address);

    let shutdown_signal = async {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to install Ctrl+C signal handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to install SIGTERM signal handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received SIGINT, initiating graceful shutdown"),
            _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?;

    info!("HTTP server shutdown complete");
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
