//! Domain event routing.
//!
//! Events are grouped onto one topic per aggregate kind so consumers of a
//! single incentive see its events in order. [`TracingDispatcher`] is the
//! dispatcher used when no broker is configured: it serializes each event the
//! way a transport would and logs it.

use employer_incentives_core::event::{DomainEvent, Event, SerializedEvent};
use employer_incentives_core::services::{DomainEventDispatcher, ServiceError, ServiceFuture};

/// Topic for events raised by apprenticeship incentives.
pub const INCENTIVE_TOPIC: &str = "apprenticeship-incentive-events";

/// Topic for events raised by employer accounts.
pub const ACCOUNT_TOPIC: &str = "account-events";

/// Maps events to topics.
pub struct EventRouter;

impl EventRouter {
    /// Topic an event is published on.
    #[must_use]
    pub const fn topic(event: &DomainEvent) -> &'static str {
        match event {
            DomainEvent::ApprenticeshipIncentiveCreated { .. }
            | DomainEvent::EarningsCalculated { .. }
            | DomainEvent::StartDateChanged { .. }
            | DomainEvent::PaymentsPaused { .. }
            | DomainEvent::PaymentsResumed { .. }
            | DomainEvent::PaymentCreated { .. }
            | DomainEvent::PaymentSent { .. } => INCENTIVE_TOPIC,
            DomainEvent::LegalEntityAdded { .. } | DomainEvent::LegalEntityRemoved { .. } => {
                ACCOUNT_TOPIC
            }
        }
    }
}

/// Dispatcher that serializes events and writes them to the log.
#[derive(Debug, Clone, Default)]
pub struct TracingDispatcher {
    source: Option<String>,
}

impl TracingDispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub const fn new() -> Self {
        Self { source: None }
    }

    /// Tags every event's metadata with the originating service name.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Serializes an event the way it would go over the wire.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Dispatch`] if the event cannot be serialized.
    pub fn serialize(&self, event: &DomainEvent) -> Result<SerializedEvent, ServiceError> {
        let metadata = self.source.as_ref().map(|source| {
            serde_json::json!({
                "source": source,
                "topic": EventRouter::topic(event),
            })
        });
        SerializedEvent::from_event(event, metadata)
            .map_err(|e| ServiceError::Dispatch(e.to_string()))
    }
}

impl DomainEventDispatcher for TracingDispatcher {
    fn dispatch<'a>(&'a self, event: &'a DomainEvent) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            let serialized = self.serialize(event)?;
            tracing::info!(
                topic = EventRouter::topic(event),
                event_type = event.event_type(),
                size = serialized.data.len(),
                "Dispatched domain event"
            );
            Ok(())
        })
    }
}
