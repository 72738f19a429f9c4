//! Domain error taxonomy.
//!
//! Business outcomes such as "apprentice is no longer eligible" are not errors;
//! they are ordinary results of an earnings calculation. The variants here are
//! the conditions that abort a mutation and are surfaced to the caller unchanged.

use chrono::NaiveDate;
use thiserror::Error;

use crate::ids::{PaymentId, PendingPaymentId};
use crate::incentive::IncentiveType;

/// Result type alias for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

/// Errors raised by domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A business rule was broken (e.g. adding the same legal entity twice).
    #[error("Domain rule violated: {0}")]
    RuleViolation(String),

    /// No collection period opens on or before the given date.
    #[error("No collection period found for date {date}")]
    PeriodNotFound {
        /// The due date that could not be placed in the calendar.
        date: NaiveDate,
    },

    /// The calendar has no period flagged as active.
    #[error("No active collection period")]
    NoActivePeriod,

    /// The requested period is the last one the calendar knows about.
    #[error("No collection period follows period {period_number} of {calendar_year}")]
    NoSuchPeriod {
        /// Calendar year of the period whose successor was requested.
        calendar_year: i16,
        /// Period number whose successor was requested.
        period_number: u8,
    },

    /// The calendar could not be constructed from the given periods.
    #[error("Invalid collection calendar: {0}")]
    InvalidCalendar(String),

    /// No pending payment with the given id belongs to the incentive.
    #[error("Pending payment {0} not found")]
    PendingPaymentNotFound(PendingPaymentId),

    /// No payment with the given id belongs to the incentive.
    #[error("Payment {0} not found")]
    PaymentNotFound(PaymentId),

    /// The payment has already been recorded as sent.
    #[error("Payment {0} has already been sent")]
    PaymentAlreadySent(PaymentId),

    /// The payment profile table has no entry for the incentive type.
    #[error("No payment profile configured for {0}")]
    ProfileNotFound(IncentiveType),
}
