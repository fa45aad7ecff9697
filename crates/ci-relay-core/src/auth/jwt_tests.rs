//! Tests for app assertion signing.

use super::*;
use crate::auth::{AppId, PrivateKey};
use crate::test_keys::test_key_pem;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

fn test_credentials(app_id: u64) -> AppCredentials {
    let key = PrivateKey::from_pem(test_key_pem()).expect("test key should parse");
    AppCredentials::new(AppId::new(app_id), key)
}

/// Decode the claims segment of a JWT without verifying the signature.
fn decode_claims(token: &str) -> AppJwtClaims {
    let mut segments = token.split('.');
    let _header = segments.next().expect("JWT should have a header segment");
    let payload = segments.next().expect("JWT should have a claims segment");
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .expect("claims segment should be base64url");
    serde_json::from_slice(&bytes).expect("claims should deserialize")
}

#[test]
fn test_sign_produces_three_segment_token() {
    let token = sign_app_jwt(&test_credentials(123456)).expect("signing should succeed");
    assert_eq!(token.split('.').count(), 3);
}

#[test]
fn test_claims_carry_app_id_and_bounded_expiry() {
    let before = Utc::now().timestamp();
    let token = sign_app_jwt(&test_credentials(123456)).expect("signing should succeed");
    let after = Utc::now().timestamp();

    let claims = decode_claims(&token);

    assert_eq!(claims.iss, 123456);

    // iat is backdated by the drift allowance.
    assert!(claims.iat <= before);
    assert!(claims.iat >= before - CLOCK_DRIFT_SECONDS - 5);

    // Expiry never exceeds the 10-minute platform cap.
    assert!(claims.exp <= after + MAX_LIFETIME_MINUTES * 60 + 5);
    assert!(claims.exp > after);
}

#[test]
fn test_header_declares_rs256() {
    let token = sign_app_jwt(&test_credentials(1)).expect("signing should succeed");
    let header_segment = token.split('.').next().expect("header segment");
    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_segment)
        .expect("header should be base64url");
    let header: serde_json::Value =
        serde_json::from_slice(&header_bytes).expect("header should be JSON");
    assert_eq!(header["alg"], "RS256");
}

#[test]
fn test_different_app_ids_produce_different_claims() {
    let token_a = sign_app_jwt(&test_credentials(1)).expect("signing should succeed");
    let token_b = sign_app_jwt(&test_credentials(2)).expect("signing should succeed");
    assert_eq!(decode_claims(&token_a).iss, 1);
    assert_eq!(decode_claims(&token_b).iss, 2);
}
