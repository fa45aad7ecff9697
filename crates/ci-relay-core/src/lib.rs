//! # CI Relay Core
//!
//! Domain library for the CI relay: a GitHub App that bridges webhook
//! deliveries (pull requests, installations, check suites) to an externally
//! triggered CI workflow, and manages check runs against commits.
//!
//! The library is organized leaf-first:
//! - [`auth`] — app credentials, signed assertions, installation token
//!   exchange
//! - [`webhook`] — HMAC signature verification over raw delivery bytes
//! - [`events`] — event envelope, typed payloads, and the (event, action)
//!   router
//! - [`client`] — authenticated GitHub REST client with a bounded
//!   conditional-GET cache
//! - [`checks`] — check-run lifecycle management (create / read / complete)
//! - [`dispatch`] — the pull-request-to-workflow-dispatch handler and its
//!   siblings
//!
//! All shared state (router, cache) is constructed by the service's
//! composition root and passed in; nothing here is a process-wide singleton.

pub mod auth;
pub mod checks;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod webhook;

pub use auth::{AppCredentials, AppId, InstallationId, InstallationToken, TokenExchanger};
pub use checks::{CheckConclusion, CheckRun, CheckRunManager, CheckStatus};
pub use client::{GitHubClient, ResponseCache};
pub use dispatch::{
    CheckSuiteRequestedHandler, DispatchConfig, DispatchPayload, InstallationCreatedHandler,
    PullRequestDispatchHandler,
};
pub use error::{
    ConfigError, CredentialError, HandlerError, ParseError, UpstreamError, VerificationError,
};
pub use events::{DispatchOutcome, EventHandler, EventRouter, WebhookEvent};
pub use webhook::SignatureValidator;
