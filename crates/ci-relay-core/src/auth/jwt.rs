//! Signed app assertions for GitHub App authentication.
//!
//! GitHub requires RS256 and caps assertion lifetime at 10 minutes. The
//! claims are `iss` (app id), `iat`, and `exp`.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use super::AppCredentials;
use crate::error::CredentialError;

/// Maximum assertion lifetime accepted by GitHub.
const MAX_LIFETIME_MINUTES: i64 = 10;

/// Allowance for clock drift between this host and GitHub. The issued-at
/// claim is backdated by this amount so a slightly fast local clock does not
/// produce an assertion GitHub considers not-yet-valid.
const CLOCK_DRIFT_SECONDS: i64 = 60;

/// Claims carried by an app assertion.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AppJwtClaims {
    /// App id.
    pub iss: u64,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
    /// Expiry, seconds since epoch.
    pub exp: i64,
}

/// Sign a short-lived assertion for the given app credentials.
///
/// # Errors
///
/// Returns [`CredentialError::InvalidPrivateKey`] when the key is rejected
/// by the encoder and [`CredentialError::JwtSigningFailed`] when encoding
/// fails.
pub fn sign_app_jwt(credentials: &AppCredentials) -> Result<String, CredentialError> {
    let now = Utc::now();
    let claims = AppJwtClaims {
        iss: credentials.app_id().as_u64(),
        iat: (now - Duration::seconds(CLOCK_DRIFT_SECONDS)).timestamp(),
        exp: (now + Duration::minutes(MAX_LIFETIME_MINUTES)).timestamp(),
    };

    let encoding_key = EncodingKey::from_rsa_pem(credentials.private_key().pem_bytes()).map_err(
        |e| CredentialError::InvalidPrivateKey {
            message: format!("Failed to create encoding key: {}", e),
        },
    )?;

    let header = Header::new(Algorithm::RS256);

    encode(&header, &claims, &encoding_key).map_err(|e| CredentialError::JwtSigningFailed {
        message: format!("Failed to encode JWT: {}", e),
    })
}

#[cfg(test)]
#[path = "jwt_tests.rs"]
mod tests;
