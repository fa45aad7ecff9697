//! Service configuration.
//!
//! All settings arrive through the `config` crate builder in `main`: optional
//! YAML files overlaid with `CI_RELAY__*` environment variables. Credential
//! material is validated here, once, before the server starts; a deployment
//! with a bad key or a missing secret never begins accepting webhooks.

use ci_relay_core::auth::{AppCredentials, AppId, PrivateKey};
use ci_relay_core::client::DEFAULT_API_URL;
use ci_relay_core::dispatch::DispatchConfig;
use ci_relay_core::error::ConfigError;
use serde::Deserialize;

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

/// HTTP server bind settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Top-level service configuration.
///
/// `app_id`, `private_key`, and `webhook_secret` have no defaults; everything
/// else falls back to built-in values so a minimal deployment configures only
/// its credentials.
#[derive(Clone, Deserialize)]
pub struct RelayConfig {
    /// GitHub App identifier.
    pub app_id: u64,

    /// Base64-encoded PEM private key of the app.
    pub private_key: String,

    /// Shared secret for webhook signature verification.
    pub webhook_secret: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default = "default_api_url")]
    pub github_api_url: String,
}

impl RelayConfig {
    /// Validate the configuration and decode the app credentials.
    ///
    /// This is the only place credential material is decoded; every handler
    /// borrows the result.
    pub fn credentials(&self) -> Result<AppCredentials, ConfigError> {
        if self.app_id == 0 {
            return Err(ConfigError::MissingValue {
                field: "app_id".to_string(),
            });
        }
        if self.webhook_secret.trim().is_empty() {
            return Err(ConfigError::MissingValue {
                field: "webhook_secret".to_string(),
            });
        }

        let private_key = PrivateKey::from_base64_pem(&self.private_key)?;
        Ok(AppCredentials::new(AppId::new(self.app_id), private_key))
    }
}

// Secrets never appear in debug output.
impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("app_id", &self.app_id)
            .field("private_key", &"<REDACTED>")
            .field("webhook_secret", &"<REDACTED>")
            .field("server", &self.server)
            .field("dispatch", &self.dispatch)
            .field("github_api_url", &self.github_api_url)
            .finish()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
