//! Webhook delivery authentication.
//!
//! GitHub signs each delivery with HMAC-SHA256 over the raw body bytes and
//! sends the result in the `X-Hub-Signature-256` header. Verification must
//! run on the bytes as received, before any JSON parsing.

mod validation;

pub use validation::SignatureValidator;
