//! Tests for the GitHub client against a mocked API.

use super::*;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> GitHubClient {
    GitHubClient::new(
        reqwest::Client::new(),
        server.uri(),
        Arc::new(ResponseCache::new(DEFAULT_CACHE_CAPACITY)),
    )
}

#[tokio::test]
async fn test_get_attaches_bearer_token_and_accept_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/o/r"))
        .and(header("authorization", "Bearer tok-1"))
        .and(header("accept", "application/vnd.github+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let body = client(&server).get("/repos/o/r", "tok-1").await.unwrap();
    assert_eq!(body["id"], 1);
}

#[tokio::test]
async fn test_non_success_becomes_upstream_status_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/o/r/check-runs/7"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let err = client(&server)
        .get("/repos/o/r/check-runs/7", "tok")
        .await
        .unwrap_err();

    match err {
        UpstreamError::Status { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "Not Found");
        }
        other => panic!("expected Status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/repos/o/r/check-runs"))
        .and(wiremock::matchers::body_json(
            serde_json::json!({"name": "build"}),
        ))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 99})))
        .expect(1)
        .mount(&server)
        .await;

    let body = client(&server)
        .post("/repos/o/r/check-runs", &serde_json::json!({"name": "build"}), "tok")
        .await
        .unwrap();
    assert_eq!(body["id"], 99);
}

#[tokio::test]
async fn test_empty_success_body_decodes_to_null() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/repos/c/ci/actions/workflows/ci.yml/dispatches"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let body = client(&server)
        .post(
            "/repos/c/ci/actions/workflows/ci.yml/dispatches",
            &serde_json::json!({"ref": "main"}),
            "tok",
        )
        .await
        .unwrap();
    assert!(body.is_null());
}

#[tokio::test]
async fn test_conditional_get_serves_304_from_cache() {
    let server = MockServer::start().await;
    let gh = client(&server);

    // First request populates the cache with the ETag.
    Mock::given(method("GET"))
        .and(path("/repos/o/r"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"v1\"")
                .set_body_json(serde_json::json!({"id": 1, "name": "r"})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let first = gh.get("/repos/o/r", "tok").await.unwrap();
    assert_eq!(first["name"], "r");

    // Second request must carry If-None-Match and accept a bodyless 304.
    Mock::given(method("GET"))
        .and(path("/repos/o/r"))
        .and(header("if-none-match", "\"v1\""))
        .respond_with(ResponseTemplate::new(304))
        .expect(1)
        .mount(&server)
        .await;

    let second = gh.get("/repos/o/r", "tok").await.unwrap();
    assert_eq!(second, first, "304 must be served from the cached body");
}

#[tokio::test]
async fn test_get_without_etag_is_not_cached() {
    let server = MockServer::start().await;
    let cache = Arc::new(ResponseCache::new(8));
    let gh = GitHubClient::new(reqwest::Client::new(), server.uri(), cache.clone());

    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    gh.get("/rate_limit", "tok").await.unwrap();
    assert!(cache.is_empty());
}
