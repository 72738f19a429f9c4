//! Collaborator contracts the domain depends on.
//!
//! # Implementations
//!
//! - In-memory repositories, calendar service, lock provider and dispatcher live
//!   in the `employer-incentives-testing` crate.
//! - `RedisLockProvider` (in `employer-incentives-redis`) is the production lock store.
//! - `ConfiguredPaymentProfiles` (in `employer-incentives-runtime`) serves the
//!   profile table from configuration.
//!
//! # Dyn Compatibility
//!
//! [`DistributedLockProvider`] and [`DomainEventDispatcher`] return
//! `Pin<Box<dyn Future>>` so they can be shared as trait objects across every
//! handler in a pipeline. The per-aggregate services use `impl Future` and are
//! used generically.

use std::fmt::{Debug, Display};
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::calendar::CollectionCalendar;
use crate::event::DomainEvent;
use crate::incentive::IncentivePaymentProfile;

/// Errors raised by infrastructure collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The lock store could not be reached or rejected the request.
    #[error("Lock provider error: {0}")]
    Lock(String),

    /// The aggregate or calendar could not be stored or loaded.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Events could not be handed to the transport.
    #[error("Dispatch error: {0}")]
    Dispatch(String),
}

/// Boxed future returned by the dyn-compatible collaborators.
pub type ServiceFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, ServiceError>> + Send + 'a>>;

/// An aggregate root a [`DomainRepository`] can load and store.
pub trait Aggregate: Send + Sync + 'static {
    /// Identifier type.
    type Id: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static;

    /// Name used in logs and `AggregateNotFound` errors.
    const KIND: &'static str;

    /// The aggregate's id.
    fn id(&self) -> Self::Id;

    /// `true` until the aggregate has been persisted once.
    fn is_new(&self) -> bool;

    /// Called by the repository after a successful write.
    fn mark_persisted(&mut self);

    /// Takes the events raised since the last flush.
    fn flush_events(&mut self) -> Vec<DomainEvent>;
}

/// Loads and stores one aggregate type.
///
/// `save` persists the whole aggregate graph, child records included, and only
/// then dispatches the flushed events. A failed write dispatches nothing.
pub trait DomainRepository<A: Aggregate>: Send + Sync {
    /// Loads an aggregate, or `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] if the store cannot be read.
    fn find(&self, id: A::Id) -> impl Future<Output = Result<Option<A>, ServiceError>> + Send;

    /// Persists the aggregate and dispatches its events.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Persistence`] if the write fails.
    /// - [`ServiceError::Dispatch`] if events could not be dispatched after the write.
    fn save(&self, aggregate: &mut A) -> impl Future<Output = Result<(), ServiceError>> + Send;
}

/// Source of the collection calendar.
pub trait CollectionCalendarService: Send + Sync {
    /// Loads the calendar.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] if the calendar cannot be read.
    fn get(&self) -> impl Future<Output = Result<CollectionCalendar, ServiceError>> + Send;

    /// Stores the calendar.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] if the calendar cannot be written.
    fn save(
        &self,
        calendar: &CollectionCalendar,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;
}

/// Source of the payment profile table.
pub trait IncentivePaymentProfilesService: Send + Sync {
    /// Loads the profile table.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] if the table cannot be read.
    fn get(
        &self,
    ) -> impl Future<Output = Result<Vec<IncentivePaymentProfile>, ServiceError>> + Send;
}

/// Named lock shared by every process that mutates the same aggregate.
pub trait DistributedLockProvider: Send + Sync {
    /// Prepares the provider (connects, verifies the store is reachable).
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Lock`] if the store is unavailable.
    fn start(&self) -> ServiceFuture<'_, ()>;

    /// Tries to take the lock named `key`, waiting up to the provider's acquire
    /// timeout. Resolves to `false` when the lock is held elsewhere or `cancel`
    /// fires first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Lock`] if the store fails.
    fn acquire_lock<'a>(
        &'a self,
        key: &'a str,
        cancel: &'a CancellationToken,
    ) -> ServiceFuture<'a, bool>;

    /// Releases the lock named `key` if this provider holds it.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Lock`] if the store fails.
    fn release_lock<'a>(&'a self, key: &'a str) -> ServiceFuture<'a, ()>;

    /// Releases held locks and drops the connection.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Lock`] if the store fails.
    fn stop(&self) -> ServiceFuture<'_, ()>;
}

/// Hands domain events to a transport.
pub trait DomainEventDispatcher: Send + Sync {
    /// Dispatches one event.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Dispatch`] if the transport rejects the event.
    fn dispatch<'a>(&'a self, event: &'a DomainEvent) -> ServiceFuture<'a, ()>;
}
