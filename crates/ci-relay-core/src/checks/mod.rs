//! Check-run lifecycle management.
//!
//! The authoritative check-run state lives on GitHub; this module is a
//! stateless façade over it. The lifecycle ordering is enforced by
//! construction rather than by a local state machine: creation always sets
//! `in_progress`, completion always sets `completed` with a conclusion, and
//! no operation on this surface can reopen a completed run.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::auth::{AppCredentials, InstallationId, TokenExchanger};
use crate::client::GitHubClient;
use crate::error::{HandlerError, UpstreamError};

/// Status of a check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Queued,
    InProgress,
    Completed,
}

/// Conclusion of a completed check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckConclusion {
    Success,
    Failure,
    Neutral,
    Cancelled,
    TimedOut,
    ActionRequired,
}

/// A check run as GitHub reports it.
///
/// Invariant: `conclusion` is present exactly when `status` is
/// [`CheckStatus::Completed`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRun {
    pub id: u64,
    pub name: String,
    pub head_sha: String,
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<CheckConclusion>,
}

/// Creates, reads, and completes check runs.
///
/// Holds no state between calls; each operation fetches its own
/// installation token.
pub struct CheckRunManager {
    client: Arc<GitHubClient>,
    exchanger: Arc<TokenExchanger>,
    credentials: AppCredentials,
}

impl CheckRunManager {
    pub fn new(
        client: Arc<GitHubClient>,
        exchanger: Arc<TokenExchanger>,
        credentials: AppCredentials,
    ) -> Self {
        Self {
            client,
            exchanger,
            credentials,
        }
    }

    /// Create a check run in `in_progress` state and return its id.
    pub async fn create(
        &self,
        installation_id: InstallationId,
        owner: &str,
        repo: &str,
        name: &str,
        head_sha: &str,
    ) -> Result<u64, HandlerError> {
        let token = self
            .exchanger
            .installation_token(&self.credentials, installation_id)
            .await?;

        let body = json!({
            "name": name,
            "head_sha": head_sha,
            "status": CheckStatus::InProgress,
        });

        let response = self
            .client
            .post(
                &format!("/repos/{}/{}/check-runs", owner, repo),
                &body,
                token.token(),
            )
            .await?;

        let id = response
            .get("id")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| UpstreamError::Decode {
                message: "check-run response is missing a numeric id".to_string(),
            })?;

        tracing::info!(owner, repo, name, head_sha, check_run_id = id, "Created check run");
        Ok(id)
    }

    /// Fetch a check run by id. A missing run surfaces as
    /// `UpstreamError::Status { status: 404, .. }`.
    pub async fn get(
        &self,
        installation_id: InstallationId,
        owner: &str,
        repo: &str,
        check_run_id: u64,
    ) -> Result<CheckRun, HandlerError> {
        let token = self
            .exchanger
            .installation_token(&self.credentials, installation_id)
            .await?;

        self.fetch(owner, repo, check_run_id, token.token()).await
    }

    /// Complete a check run with the supplied conclusion.
    ///
    /// GitHub's PATCH requires the run's name and head sha, so the current
    /// run is read first. The read-then-patch pair is not transactional; a
    /// concurrent completion is acceptable because completed runs are
    /// terminal and a second completion PATCH is idempotent upstream.
    pub async fn update(
        &self,
        installation_id: InstallationId,
        owner: &str,
        repo: &str,
        check_run_id: u64,
        conclusion: CheckConclusion,
    ) -> Result<CheckRun, HandlerError> {
        let token = self
            .exchanger
            .installation_token(&self.credentials, installation_id)
            .await?;

        let current = self.fetch(owner, repo, check_run_id, token.token()).await?;

        let body = json!({
            "name": current.name,
            "head_sha": current.head_sha,
            "status": CheckStatus::Completed,
            "conclusion": conclusion,
        });

        let response = self
            .client
            .patch(
                &format!("/repos/{}/{}/check-runs/{}", owner, repo, check_run_id),
                &body,
                token.token(),
            )
            .await?;

        let updated: CheckRun =
            serde_json::from_value(response).map_err(|e| UpstreamError::Decode {
                message: e.to_string(),
            })?;

        tracing::info!(
            owner,
            repo,
            check_run_id,
            conclusion = ?conclusion,
            "Completed check run"
        );
        Ok(updated)
    }

    async fn fetch(
        &self,
        owner: &str,
        repo: &str,
        check_run_id: u64,
        token: &str,
    ) -> Result<CheckRun, HandlerError> {
        let response = self
            .client
            .get(
                &format!("/repos/{}/{}/check-runs/{}", owner, repo, check_run_id),
                token,
            )
            .await?;

        let run = serde_json::from_value(response).map_err(|e| UpstreamError::Decode {
            message: e.to_string(),
        })?;
        Ok(run)
    }
}

impl std::fmt::Debug for CheckRunManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckRunManager")
            .field("client", &self.client)
            .finish()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
