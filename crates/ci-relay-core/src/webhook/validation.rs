//! Webhook signature validation.
//!
//! HMAC-SHA256 over the raw payload with constant-time comparison to prevent
//! timing attacks.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header value prefix GitHub uses for SHA-256 signatures.
const SIGNATURE_PREFIX: &str = "sha256=";

/// Validates webhook deliveries against the shared secret.
///
/// `verify` never fails with an error: a missing, malformed, or mismatched
/// signature all yield `false`. An absent body is a verification failure,
/// not an empty-signature match.
#[derive(Clone)]
pub struct SignatureValidator {
    secret: Vec<u8>,
}

impl SignatureValidator {
    /// Create a validator for the given shared secret.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verify a delivery signature over the raw, unparsed body bytes.
    ///
    /// The bytes must be the ones received on the wire; re-serializing
    /// parsed JSON would change whitespace and key order and invalidate the
    /// signature.
    pub fn verify(&self, payload: &[u8], signature_header: Option<&str>) -> bool {
        let Some(header) = signature_header else {
            return false;
        };

        if payload.is_empty() {
            return false;
        }

        let Some(hex_signature) = header.strip_prefix(SIGNATURE_PREFIX) else {
            return false;
        };

        let Ok(claimed) = hex::decode(hex_signature) else {
            return false;
        };

        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return false;
        };
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        // Length check is not secret-dependent; the content comparison is
        // constant-time.
        if claimed.len() != expected.len() {
            return false;
        }

        claimed.ct_eq(&expected).into()
    }
}

// Secrets never appear in debug output.
impl std::fmt::Debug for SignatureValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureValidator")
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
