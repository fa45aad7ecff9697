//! Webhook event envelope and typed payload views.
//!
//! A [`WebhookEvent`] is constructed once per verified delivery and
//! discarded after dispatch. Handlers project the untyped payload into the
//! explicit per-event schemas below and fail fast with a [`ParseError`] when
//! required fields are absent, rather than propagating lookup failures from
//! deep inside handler logic.

mod router;

pub use router::{DispatchOutcome, EventHandler, EventRouter, HandlerFailure};

use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;

/// Event type GitHub sends to confirm webhook configuration. Requires a
/// valid signature but bypasses routing.
pub const PING_EVENT: &str = "ping";

/// One webhook delivery, parsed from the verified request.
///
/// Immutable once constructed. `action` is absent for event types that do
/// not carry one.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    event_type: String,
    action: Option<String>,
    delivery_id: String,
    payload: Value,
}

impl WebhookEvent {
    /// Parse an envelope from the delivery headers and raw body.
    ///
    /// The body must already have passed signature verification.
    pub fn from_http(
        event_type: &str,
        delivery_id: &str,
        body: &[u8],
    ) -> Result<Self, ParseError> {
        let payload: Value =
            serde_json::from_slice(body).map_err(|e| ParseError::InvalidJson {
                message: e.to_string(),
            })?;

        let action = payload
            .get("action")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            event_type: event_type.to_string(),
            action,
            delivery_id: delivery_id.to_string(),
            payload,
        })
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn delivery_id(&self) -> &str {
        &self.delivery_id
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn is_ping(&self) -> bool {
        self.event_type == PING_EVENT
    }

    /// Project the payload into a typed per-event schema.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidPayload`] naming the event type when
    /// required fields are missing or of the wrong shape.
    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, ParseError> {
        serde_json::from_value(self.payload.clone()).map_err(|e| ParseError::InvalidPayload {
            event_type: self.event_type.clone(),
            message: e.to_string(),
        })
    }
}

// ============================================================================
// Typed payload schemas
// ============================================================================

/// Reference to the installation an event belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallationRef {
    pub id: u64,
}

/// Account reference as it appears in event payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountRef {
    pub login: String,
}

/// Repository reference as it appears in event payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoRef {
    pub name: String,
    pub full_name: String,
}

/// Head of a pull request: commit sha plus the owning user and repository.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestHead {
    pub sha: String,
    pub user: AccountRef,
    pub repo: RepoRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestRef {
    pub head: PullRequestHead,
}

/// `pull_request` event payload, reduced to the fields CI dispatch needs.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    pub pull_request: PullRequestRef,
    pub installation: InstallationRef,
}

/// `installation` / `created` event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallationCreatedPayload {
    pub installation: InstallationRef,
    #[serde(default)]
    pub repositories: Vec<RepoRef>,
}

/// `ping` event payload, sent by GitHub when a webhook is first configured.
#[derive(Debug, Clone, Deserialize)]
pub struct PingPayload {
    pub zen: String,
}

/// `check_suite` event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckSuitePayload {
    pub check_suite: CheckSuiteRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckSuiteRef {
    pub head_sha: String,
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
