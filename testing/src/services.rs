//! In-memory calendar and payment profile services.

use employer_incentives_core::calendar::CollectionCalendar;
use employer_incentives_core::incentive::IncentivePaymentProfile;
use employer_incentives_core::services::{
    CollectionCalendarService, IncentivePaymentProfilesService, ServiceError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Calendar service holding one calendar.
#[derive(Clone, Debug)]
pub struct InMemoryCalendarService {
    calendar: Arc<RwLock<CollectionCalendar>>,
    saves: Arc<AtomicUsize>,
}

#[allow(clippy::unwrap_used)]
#[allow(clippy::missing_panics_doc)]
impl InMemoryCalendarService {
    /// Serves `calendar`.
    #[must_use]
    pub fn new(calendar: CollectionCalendar) -> Self {
        Self {
            calendar: Arc::new(RwLock::new(calendar)),
            saves: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The stored calendar.
    #[must_use]
    pub fn current(&self) -> CollectionCalendar {
        self.calendar.read().unwrap().clone()
    }

    /// Replaces the stored calendar without counting a save.
    pub fn replace(&self, calendar: CollectionCalendar) {
        *self.calendar.write().unwrap() = calendar;
    }

    /// Calls to `save`.
    #[must_use]
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[allow(clippy::unwrap_used)]
impl CollectionCalendarService for InMemoryCalendarService {
    async fn get(&self) -> Result<CollectionCalendar, ServiceError> {
        Ok(self.current())
    }

    async fn save(&self, calendar: &CollectionCalendar) -> Result<(), ServiceError> {
        *self.calendar.write().unwrap() = calendar.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Payment profile service returning a fixed table.
#[derive(Clone, Debug, Default)]
pub struct StaticPaymentProfiles {
    profiles: Vec<IncentivePaymentProfile>,
}

impl StaticPaymentProfiles {
    /// Serves `profiles`.
    #[must_use]
    pub const fn new(profiles: Vec<IncentivePaymentProfile>) -> Self {
        Self { profiles }
    }
}

impl IncentivePaymentProfilesService for StaticPaymentProfiles {
    async fn get(&self) -> Result<Vec<IncentivePaymentProfile>, ServiceError> {
        Ok(self.profiles.clone())
    }
}
