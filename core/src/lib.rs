//! # Employer Incentives Core
//!
//! Domain model for the apprenticeship hiring incentive scheme.
//!
//! ## Core Concepts
//!
//! - **Collection calendar**: the fiscal periods payments are scheduled against
//! - **Incentive**: eligibility and the two milestone payments an apprentice earns
//! - **Apprenticeship incentive**: aggregate owning pending payments, payments and
//!   clawbacks, reconciled on every earnings calculation
//! - **Account**: employer account and its legal entities
//! - **Domain events**: closed enum raised by aggregates, dispatched after save
//!
//! ## Architecture Principles
//!
//! - Aggregates mutate synchronously and never perform I/O
//! - Persistence, locking and dispatch sit behind the traits in [`services`]
//! - Business outcomes (ineligible, nothing changed) are values, not errors
//!
//! ## Example
//!
//! ```
//! use employer_incentives_core::calendar::{CollectionCalendar, CollectionPeriod};
//! use employer_incentives_core::incentive::{
//!     IncentivePaymentProfile, IncentiveType, PaymentProfile,
//! };
//! use employer_incentives_core::{
//!     AccountRef, ApplicationApprenticeshipId, Apprenticeship, ApprenticeshipIncentive,
//!     ApprenticeshipIncentiveId, EmployerType, NaiveDate,
//! };
//! use rust_decimal::Decimal;
//!
//! # fn main() -> Result<(), employer_incentives_core::DomainError> {
//! let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
//!
//! let calendar = CollectionCalendar::new(vec![
//!     CollectionPeriod::new(6, 1, 2021, 2021, date(2021, 1, 6)).activated(),
//!     CollectionPeriod::new(10, 5, 2021, 2021, date(2021, 5, 6)),
//! ])?;
//! let profiles = vec![IncentivePaymentProfile::new(
//!     IncentiveType::UnderTwentyFiveIncentive,
//!     PaymentProfile::new(89, Decimal::from(1000)),
//!     PaymentProfile::new(364, Decimal::from(1000)),
//! )];
//!
//! let mut incentive = ApprenticeshipIncentive::new(
//!     ApprenticeshipIncentiveId::new(),
//!     AccountRef::new(1, 2),
//!     ApplicationApprenticeshipId::new(),
//!     Apprenticeship::new(3, "Sam", "Jones", date(2003, 4, 1), 100, EmployerType::Levy),
//!     date(2021, 2, 1),
//!     date(2021, 2, 10),
//!     "employer@example.com",
//! );
//!
//! let outcome = incentive.calculate_earnings(&calendar, &profiles)?;
//! assert!(outcome.is_eligible);
//! assert_eq!(incentive.pending_payments().len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod apprenticeship;
pub mod apprenticeship_incentive;
pub mod calendar;
pub mod error;
pub mod event;
pub mod ids;
pub mod incentive;
pub mod services;

// Re-export commonly used types
pub use account::{Account, LegalEntity};
pub use apprenticeship::{Apprenticeship, EmployerType};
pub use apprenticeship_incentive::{
    ApprenticeshipIncentive, ApprenticeshipIncentiveSnapshot, EarningsOutcome, PaymentsView,
};
pub use chrono::NaiveDate;
pub use error::{DomainError, Result};
pub use event::DomainEvent;
pub use ids::{
    AccountRef, ApplicationApprenticeshipId, ApprenticeshipIncentiveId, ClawbackPaymentId,
    PaymentId, PendingPaymentId,
};
pub use services::{Aggregate, ServiceError};
pub use tokio_util::sync::CancellationToken;
