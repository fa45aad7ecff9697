//! GitHub App authentication: credentials, signed assertions, and
//! installation token exchange.
//!
//! Authentication happens in two steps. The app signs a short-lived JWT
//! assertion with its RSA private key ([`jwt`]), then exchanges it for an
//! installation-scoped access token ([`TokenExchanger`]). Tokens are fetched
//! per request and never cached across requests or persisted.

pub mod jwt;
pub mod tokens;

pub use tokens::TokenExchanger;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Unique identifier for a GitHub App.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppId(u64);

impl AppId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an installation of the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstallationId(u64);

impl InstallationId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for InstallationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// RSA private key for signing app assertions.
///
/// The key material is validated on construction so a malformed deployment
/// key aborts startup instead of failing the first webhook.
#[derive(Clone)]
pub struct PrivateKey {
    pem: Vec<u8>,
}

impl PrivateKey {
    /// Create a private key from a PEM-encoded string.
    ///
    /// Accepts PKCS#1 (`RSA PRIVATE KEY`) and PKCS#8 (`PRIVATE KEY`)
    /// encodings.
    pub fn from_pem(pem: &str) -> Result<Self, ConfigError> {
        let pem = pem.trim();

        if pem.is_empty() {
            return Err(ConfigError::InvalidPrivateKey {
                message: "PEM string cannot be empty".to_string(),
            });
        }

        if !pem.contains("-----BEGIN") || !pem.contains("-----END") {
            return Err(ConfigError::InvalidPrivateKey {
                message: "Invalid PEM format: missing BEGIN/END markers".to_string(),
            });
        }

        // Parse eagerly to validate the key material.
        RsaPrivateKey::from_pkcs1_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
            .map_err(|e| ConfigError::InvalidPrivateKey {
                message: format!("Failed to parse RSA private key: {}", e),
            })?;

        Ok(Self {
            pem: pem.as_bytes().to_vec(),
        })
    }

    /// Create a private key from a base64-encoded PEM string, the form the
    /// key arrives in from the configuration source.
    ///
    /// Decoding failure is a [`ConfigError::InvalidBase64`], distinct from
    /// a well-encoded but malformed key.
    pub fn from_base64_pem(encoded: &str) -> Result<Self, ConfigError> {
        let decoded =
            BASE64
                .decode(encoded.trim())
                .map_err(|e| ConfigError::InvalidBase64 {
                    field: "private_key".to_string(),
                    message: e.to_string(),
                })?;

        let pem = String::from_utf8(decoded).map_err(|e| ConfigError::InvalidBase64 {
            field: "private_key".to_string(),
            message: format!("decoded key is not valid UTF-8: {}", e),
        })?;

        Self::from_pem(&pem)
    }

    /// Raw PEM bytes for handing to the JWT encoder.
    pub fn pem_bytes(&self) -> &[u8] {
        &self.pem
    }
}

// Key material never appears in debug output.
impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("pem", &"<REDACTED>")
            .finish()
    }
}

/// The app identity used for every token exchange.
///
/// There is exactly one credential-decoding path: the key is decoded once at
/// startup and every handler borrows the same credentials.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    app_id: AppId,
    private_key: PrivateKey,
}

impl AppCredentials {
    pub fn new(app_id: AppId, private_key: PrivateKey) -> Self {
        Self {
            app_id,
            private_key,
        }
    }

    pub fn app_id(&self) -> AppId {
        self.app_id
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }
}

/// Short-lived credential scoped to one app installation.
///
/// Owned transiently by the request that fetched it; never persisted and
/// never logged.
#[derive(Clone)]
pub struct InstallationToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl InstallationToken {
    pub fn new(token: String, expires_at: DateTime<Utc>) -> Self {
        Self { token, expires_at }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

// Token material never appears in debug output.
impl std::fmt::Debug for InstallationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationToken")
            .field("token", &"<REDACTED>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
