//! Recording event dispatcher.

use employer_incentives_core::event::Event;
use employer_incentives_core::services::{DomainEventDispatcher, ServiceError, ServiceFuture};
use employer_incentives_core::DomainEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Dispatcher that keeps every event it is given, in order.
#[derive(Clone, Debug, Default)]
pub struct RecordingDispatcher {
    events: Arc<Mutex<Vec<DomainEvent>>>,
    failing: Arc<AtomicBool>,
}

#[allow(clippy::unwrap_used)]
#[allow(clippy::missing_panics_doc)]
impl RecordingDispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events dispatched so far.
    #[must_use]
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Event type names dispatched so far.
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(Event::event_type)
            .collect()
    }

    /// Forgets every recorded event.
    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Makes every dispatch fail with [`ServiceError::Dispatch`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl DomainEventDispatcher for RecordingDispatcher {
    #[allow(clippy::unwrap_used)]
    fn dispatch<'a>(&'a self, event: &'a DomainEvent) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            if self.failing.load(Ordering::SeqCst) {
                return Err(ServiceError::Dispatch(format!(
                    "transport rejected {}",
                    event.event_type()
                )));
            }
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        })
    }
}
