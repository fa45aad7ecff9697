//! In-memory dispatch table keyed by (event type, action).
//!
//! The router is constructed once at the composition root and registered
//! handlers run in registration order. An individual handler failure never
//! prevents sibling handlers from running; errors are collected into the
//! [`DispatchOutcome`] for the endpoint to log. Delivery is already
//! acknowledged to GitHub by the time handlers run their course, so there is
//! nothing useful a short-circuit could protect.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::WebhookEvent;
use crate::error::HandlerError;

/// Application logic for one (event type, action) registration.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Stable name used in logs and error reports.
    fn name(&self) -> &'static str;

    /// Handle one delivery.
    async fn handle(&self, event: &WebhookEvent) -> Result<(), HandlerError>;
}

/// A single handler failure captured during dispatch.
#[derive(Debug)]
pub struct HandlerFailure {
    pub handler: &'static str,
    pub error: HandlerError,
}

/// Result of dispatching one event.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// Number of handlers that ran (successfully or not).
    pub handled: usize,
    /// Failures collected from individual handlers.
    pub failures: Vec<HandlerFailure>,
}

impl DispatchOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RouteKey {
    event_type: String,
    /// `None` is the wildcard entry: it matches deliveries with any action
    /// or none at all.
    action: Option<String>,
}

/// Maps (event type, action) pairs to registered handlers.
#[derive(Default)]
pub struct EventRouter {
    routes: HashMap<RouteKey, Vec<Arc<dyn EventHandler>>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Register a handler for an exact (event type, action) pair.
    pub fn register(
        &mut self,
        event_type: impl Into<String>,
        action: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) {
        let key = RouteKey {
            event_type: event_type.into(),
            action: Some(action.into()),
        };
        self.routes.entry(key).or_default().push(handler);
    }

    /// Register a handler for an event type regardless of action. Events
    /// without an action field route only through these entries.
    pub fn register_any(&mut self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) {
        let key = RouteKey {
            event_type: event_type.into(),
            action: None,
        };
        self.routes.entry(key).or_default().push(handler);
    }

    /// Dispatch one event to every matching handler.
    ///
    /// Handlers for the exact (type, action) key run first, then wildcard
    /// registrations for the type, each list in registration order. A
    /// failing handler is recorded and its siblings still run. No match is
    /// a silent no-op.
    pub async fn dispatch(&self, event: &WebhookEvent) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        let exact = event.action().and_then(|action| {
            self.routes.get(&RouteKey {
                event_type: event.event_type().to_string(),
                action: Some(action.to_string()),
            })
        });
        let wildcard = self.routes.get(&RouteKey {
            event_type: event.event_type().to_string(),
            action: None,
        });

        let matched = exact
            .into_iter()
            .flatten()
            .chain(wildcard.into_iter().flatten());

        for handler in matched {
            outcome.handled += 1;
            if let Err(error) = handler.handle(event).await {
                outcome.failures.push(HandlerFailure {
                    handler: handler.name(),
                    error,
                });
            }
        }

        if outcome.handled == 0 {
            debug!(
                event_type = event.event_type(),
                action = event.action().unwrap_or("-"),
                delivery_id = event.delivery_id(),
                "No handler registered; ignoring event"
            );
        }

        outcome
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("routes", &self.routes.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
