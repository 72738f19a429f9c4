//! # Employer Incentives Testing
//!
//! In-memory collaborators and fixtures for testing the incentives domain and
//! its command pipeline without Redis or a database.
//!
//! This crate provides:
//! - [`InMemoryLockProvider`]: refuses held keys immediately and counts every call
//! - [`InMemoryRepository`]: stores aggregates and dispatches their events on save
//! - [`InMemoryCalendarService`] and [`StaticPaymentProfiles`]
//! - [`RecordingDispatcher`]: keeps dispatched events for assertions
//! - [`fixtures`]: calendars, profile tables and an incentive builder
//!
//! ## Example
//!
//! ```
//! use employer_incentives_core::services::DomainRepository;
//! use employer_incentives_testing::fixtures::{monthly_calendar, payment_profiles, IncentiveBuilder};
//! use employer_incentives_testing::InMemoryIncentiveRepository;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repository = InMemoryIncentiveRepository::new();
//! let mut incentive = IncentiveBuilder::new().build();
//!
//! let outcome =
//!     incentive.calculate_earnings(&monthly_calendar((2020, 11)), &payment_profiles(1000, 1000))?;
//! assert!(outcome.is_eligible);
//! repository.save(&mut incentive).await?;
//!
//! assert_eq!(repository.len(), 1);
//! # Ok(())
//! # }
//! ```

mod dispatcher;
pub mod fixtures;
mod lock;
mod repository;
mod services;

pub use dispatcher::RecordingDispatcher;
pub use lock::InMemoryLockProvider;
pub use repository::{InMemoryAccountRepository, InMemoryIncentiveRepository, InMemoryRepository};
pub use services::{InMemoryCalendarService, StaticPaymentProfiles};
