//! Error types for CI relay operations.
//!
//! Each concern carries its own error enum so callers can distinguish
//! configuration problems (fail fast at startup) from credential exchange
//! rejections and upstream API failures (surfaced per request).

use thiserror::Error;

/// Malformed or missing configuration.
///
/// These errors are not retryable and should abort startup where detectable.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required configuration value is absent.
    #[error("Missing configuration value: {field}")]
    MissingValue { field: String },

    /// A value that must be base64-encoded could not be decoded.
    #[error("Invalid base64 in {field}: {message}")]
    InvalidBase64 { field: String, message: String },

    /// The app private key could not be parsed as an RSA PEM.
    #[error("Invalid private key: {message}")]
    InvalidPrivateKey { message: String },

    /// A configuration value is present but unusable.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Token exchange rejected or impossible.
///
/// Covers JWT signing failures and the platform refusing to mint an
/// installation token. Never retried; surfaced as a request failure.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The private key was rejected when constructing the signing key.
    #[error("Invalid private key: {message}")]
    InvalidPrivateKey { message: String },

    /// The app assertion could not be signed.
    #[error("JWT signing failed: {message}")]
    JwtSigningFailed { message: String },

    /// GitHub rejected the token exchange (unknown app, missing or
    /// suspended installation).
    #[error("Token exchange rejected: {status} - {message}")]
    ExchangeRejected { status: u16, message: String },

    /// The exchange response could not be decoded.
    #[error("Malformed token exchange response: {message}")]
    MalformedResponse { message: String },

    /// Transport failure talking to the token endpoint.
    #[error("Network error during token exchange: {message}")]
    Network { message: String },
}

/// Non-2xx response or transport failure from the GitHub REST API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// GitHub returned a non-success status. The caller decides whether
    /// this is fatal.
    #[error("GitHub API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Transport-level failure (connect, timeout, TLS).
    #[error("GitHub API request failed: {message}")]
    Network { message: String },

    /// The response body could not be decoded as the expected JSON shape.
    #[error("Failed to decode GitHub API response: {message}")]
    Decode { message: String },
}

impl UpstreamError {
    /// Status code of the upstream response, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this error represents a transient condition.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Network { .. } => true,
            Self::Decode { .. } => false,
        }
    }
}

/// Malformed webhook envelope or event payload.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A required delivery header is absent.
    #[error("Missing required header: {header}")]
    MissingHeader { header: &'static str },

    /// The request body is not valid JSON.
    #[error("Invalid JSON payload: {message}")]
    InvalidJson { message: String },

    /// The payload is valid JSON but lacks fields the event type requires.
    #[error("Invalid {event_type} payload: {message}")]
    InvalidPayload {
        event_type: String,
        message: String,
    },
}

/// Signature mismatch on an inbound webhook delivery.
///
/// Always terminal for the request; the endpoint translates it to a 500.
#[derive(Debug, Error)]
#[error("webhook signature verification failed")]
pub struct VerificationError;

/// Failure of one unit of request-scoped work.
///
/// Shared by webhook event handlers and the check-run control operations:
/// both can fail on credentials, on the upstream API, or on payload shape.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
