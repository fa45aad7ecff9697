//! Installation token exchange.
//!
//! Converts app credentials plus an installation id into a time-bounded
//! installation access token with a single authenticated POST. There is no
//! caching here by design: every caller incurs one round trip, and tokens
//! never outlive the request that fetched them.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{jwt, AppCredentials, InstallationId, InstallationToken};
use crate::error::CredentialError;

/// Exchanges a signed app assertion for an installation-scoped token.
#[derive(Clone)]
pub struct TokenExchanger {
    http: reqwest::Client,
    base_url: String,
}

/// Wire shape of GitHub's access-token response.
#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    token: String,
    expires_at: DateTime<Utc>,
}

impl TokenExchanger {
    /// Create a new exchanger targeting the given API base URL.
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Exchange app credentials for an installation token.
    ///
    /// Signs a fresh assertion and POSTs it to
    /// `/app/installations/{id}/access_tokens`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::ExchangeRejected`] when the app id is
    /// unknown to GitHub or the installation does not exist or is suspended,
    /// and the signing errors from [`jwt::sign_app_jwt`] unchanged.
    pub async fn installation_token(
        &self,
        credentials: &AppCredentials,
        installation_id: InstallationId,
    ) -> Result<InstallationToken, CredentialError> {
        let assertion = jwt::sign_app_jwt(credentials)?;

        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.base_url,
            installation_id.as_u64()
        );

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", assertion))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| CredentialError::Network {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::ExchangeRejected {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: AccessTokenResponse =
            response
                .json()
                .await
                .map_err(|e| CredentialError::MalformedResponse {
                    message: e.to_string(),
                })?;

        tracing::debug!(
            installation_id = installation_id.as_u64(),
            expires_at = %body.expires_at,
            "Exchanged app assertion for installation token"
        );

        Ok(InstallationToken::new(body.token, body.expires_at))
    }
}

impl std::fmt::Debug for TokenExchanger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenExchanger")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
#[path = "tokens_tests.rs"]
mod tests;
