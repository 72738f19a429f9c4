//! In-memory repositories.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use employer_incentives_core::services::{
    Aggregate, DomainEventDispatcher, DomainRepository, ServiceError,
};
use employer_incentives_core::{Account, ApprenticeshipIncentive};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Repository holding aggregates in a `HashMap`.
///
/// `save` stores the aggregate, marks it persisted, then hands its flushed
/// events to the dispatcher in order. A failed save leaves both the store and
/// the aggregate's events untouched.
pub struct InMemoryRepository<A: Aggregate> {
    records: Arc<Mutex<HashMap<A::Id, A>>>,
    dispatcher: Option<Arc<dyn DomainEventDispatcher>>,
    fail_next_save: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

/// Repository of apprenticeship incentives.
pub type InMemoryIncentiveRepository = InMemoryRepository<ApprenticeshipIncentive>;

/// Repository of employer accounts.
pub type InMemoryAccountRepository = InMemoryRepository<Account>;

impl<A: Aggregate + Clone> InMemoryRepository<A> {
    /// Creates an empty repository that drops events on save.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            dispatcher: None,
            fail_next_save: Arc::new(AtomicBool::new(false)),
            saves: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Dispatches saved events through `dispatcher`.
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn DomainEventDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Stores an aggregate as already persisted, discarding its pending events.
    pub fn seed(&self, mut aggregate: A) {
        aggregate.flush_events();
        aggregate.mark_persisted();
        self.records.lock().unwrap().insert(aggregate.id(), aggregate);
    }

    /// The stored copy of an aggregate.
    #[must_use]
    pub fn get(&self, id: A::Id) -> Option<A> {
        self.records.lock().unwrap().get(&id).cloned()
    }

    /// Number of stored aggregates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Whether the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }

    /// Successful saves.
    #[must_use]
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Makes the next save fail with [`ServiceError::Persistence`].
    pub fn fail_next_save(&self) {
        self.fail_next_save.store(true, Ordering::SeqCst);
    }
}

impl<A: Aggregate + Clone> Default for InMemoryRepository<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Aggregate> Clone for InMemoryRepository<A> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            dispatcher: self.dispatcher.clone(),
            fail_next_save: Arc::clone(&self.fail_next_save),
            saves: Arc::clone(&self.saves),
        }
    }
}

impl<A: Aggregate + Clone> DomainRepository<A> for InMemoryRepository<A> {
    async fn find(&self, id: A::Id) -> Result<Option<A>, ServiceError> {
        Ok(self.get(id))
    }

    async fn save(&self, aggregate: &mut A) -> Result<(), ServiceError> {
        if self.fail_next_save.swap(false, Ordering::SeqCst) {
            return Err(ServiceError::Persistence(format!(
                "{} {} could not be stored",
                A::KIND,
                aggregate.id()
            )));
        }

        let events = aggregate.flush_events();
        aggregate.mark_persisted();
        self.records
            .lock()
            .unwrap()
            .insert(aggregate.id(), aggregate.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);

        if let Some(dispatcher) = &self.dispatcher {
            for event in &events {
                dispatcher.dispatch(event).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::RecordingDispatcher;
    use crate::fixtures::IncentiveBuilder;
    use employer_incentives_core::DomainEvent;

    #[tokio::test]
    async fn save_persists_then_dispatches_flushed_events() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let repository = InMemoryIncentiveRepository::new().with_dispatcher(dispatcher.clone());
        let mut incentive = IncentiveBuilder::new().build();

        repository.save(&mut incentive).await.unwrap();

        assert!(!incentive.is_new());
        assert!(incentive.pending_events().is_empty());
        assert_eq!(repository.len(), 1);
        assert!(matches!(
            dispatcher.events().as_slice(),
            [DomainEvent::ApprenticeshipIncentiveCreated { .. }]
        ));
    }

    #[tokio::test]
    async fn failed_save_keeps_events_and_stores_nothing() {
        let repository = InMemoryIncentiveRepository::new();
        let mut incentive = IncentiveBuilder::new().build();
        repository.fail_next_save();

        let result = repository.save(&mut incentive).await;

        assert!(matches!(result, Err(ServiceError::Persistence(_))));
        assert!(repository.is_empty());
        assert_eq!(incentive.pending_events().len(), 1);

        repository.save(&mut incentive).await.unwrap();
        assert_eq!(repository.saves(), 1);
    }

    #[tokio::test]
    async fn seeded_aggregates_load_as_persisted() {
        let repository = InMemoryAccountRepository::new();
        repository.seed(Account::new(7));

        let account = repository.find(7).await.unwrap().unwrap();
        assert!(!account.is_new());
        assert!(repository.find(8).await.unwrap().is_none());
    }
}
