//! Tests for installation token exchange against a mocked GitHub API.

use super::*;
use crate::auth::{AppCredentials, AppId, PrivateKey};
use crate::test_keys::test_key_pem;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_credentials() -> AppCredentials {
    let key = PrivateKey::from_pem(test_key_pem()).expect("test key should parse");
    AppCredentials::new(AppId::new(123456), key)
}

fn exchanger(server: &MockServer) -> TokenExchanger {
    TokenExchanger::new(reqwest::Client::new(), server.uri())
}

#[tokio::test]
async fn test_exchange_returns_token_and_expiry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/app/installations/42/access_tokens"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "token": "ghs_tok-1",
            "expires_at": "2030-01-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = exchanger(&server)
        .installation_token(&test_credentials(), InstallationId::new(42))
        .await
        .expect("exchange should succeed");

    assert_eq!(token.token(), "ghs_tok-1");
    assert!(!token.is_expired());
}

#[tokio::test]
async fn test_exchange_rejection_carries_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/app/installations/999/access_tokens"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let err = exchanger(&server)
        .installation_token(&test_credentials(), InstallationId::new(999))
        .await
        .unwrap_err();

    match err {
        CredentialError::ExchangeRejected { status, .. } => assert_eq!(status, 404),
        other => panic!("expected ExchangeRejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_exchange_rejects_malformed_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/app/installations/42/access_tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = exchanger(&server)
        .installation_token(&test_credentials(), InstallationId::new(42))
        .await
        .unwrap_err();

    assert!(matches!(err, CredentialError::MalformedResponse { .. }));
}

#[tokio::test]
async fn test_exchange_sends_bearer_assertion() {
    let server = MockServer::start().await;

    // The authorization header must carry a Bearer JWT, not the raw key.
    Mock::given(method("POST"))
        .and(path("/app/installations/42/access_tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "token": "ghs_tok-1",
            "expires_at": "2030-01-01T00:00:00Z"
        })))
        .mount(&server)
        .await;

    exchanger(&server)
        .installation_token(&test_credentials(), InstallationId::new(42))
        .await
        .expect("exchange should succeed");

    let requests = server.received_requests().await.expect("recording enabled");
    let auth = requests[0]
        .headers
        .get("authorization")
        .expect("authorization header present")
        .to_str()
        .expect("header is ASCII");
    assert!(auth.starts_with("Bearer "));
    assert_eq!(auth.trim_start_matches("Bearer ").split('.').count(), 3);
}
