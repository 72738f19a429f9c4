//! Eligibility and entitlement calculation.
//!
//! [`Incentive::calculate`] is a pure function of the apprentice's date of birth,
//! the apprenticeship start date and the configured payment profiles. It yields
//! either nothing (start date outside the scheme window) or exactly two candidate
//! payments, first milestone then second.

use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use crate::error::{DomainError, Result};

/// Age at which the higher-age payment profile applies.
pub const TWENTY_FIVE: u32 = 25;

/// Age bracket that selects a payment profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncentiveType {
    /// Apprentice younger than 25 on the start date
    UnderTwentyFiveIncentive,
    /// Apprentice 25 or older on the start date
    TwentyFiveOrOverIncentive,
}

impl IncentiveType {
    /// Bracket for an apprentice of the given age.
    #[must_use]
    pub const fn for_age(age: u32) -> Self {
        if age >= TWENTY_FIVE {
            Self::TwentyFiveOrOverIncentive
        } else {
            Self::UnderTwentyFiveIncentive
        }
    }
}

impl fmt::Display for IncentiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnderTwentyFiveIncentive => write!(f, "UnderTwentyFiveIncentive"),
            Self::TwentyFiveOrOverIncentive => write!(f, "TwentyFiveOrOverIncentive"),
        }
    }
}

/// Which milestone of the two-payment schedule a payment belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EarningType {
    /// First milestone payment
    FirstPayment,
    /// Second milestone payment
    SecondPayment,
}

impl EarningType {
    /// Both earning types, in schedule order.
    pub const ALL: [Self; 2] = [Self::FirstPayment, Self::SecondPayment];
}

/// One milestone: paid `days_after_start` days after the apprenticeship starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProfile {
    /// Days between the start date and the due date
    pub days_after_start: u32,
    /// Amount paid at this milestone
    pub amount: Decimal,
}

impl PaymentProfile {
    /// Creates a payment profile
    #[must_use]
    pub const fn new(days_after_start: u32, amount: Decimal) -> Self {
        Self {
            days_after_start,
            amount,
        }
    }
}

/// The two milestone profiles for one age bracket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncentivePaymentProfile {
    /// Age bracket this profile applies to
    pub incentive_type: IncentiveType,
    /// First and second milestone, in that order
    pub profiles: [PaymentProfile; 2],
}

impl IncentivePaymentProfile {
    /// Creates an incentive payment profile
    #[must_use]
    pub const fn new(
        incentive_type: IncentiveType,
        first: PaymentProfile,
        second: PaymentProfile,
    ) -> Self {
        Self {
            incentive_type,
            profiles: [first, second],
        }
    }
}

/// Inclusive date range an apprenticeship must start in to qualify.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityWindow {
    /// First qualifying start date
    pub start: NaiveDate,
    /// Last qualifying start date
    pub end: NaiveDate,
}

impl EligibilityWindow {
    /// Scheme window: 1 August 2020 to 31 March 2021, both inclusive.
    #[must_use]
    pub fn scheme() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2020, 8, 1).unwrap_or(NaiveDate::MIN),
            end: NaiveDate::from_ymd_opt(2021, 3, 31).unwrap_or(NaiveDate::MIN),
        }
    }

    /// Creates a window
    #[must_use]
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Whether `start_date` falls inside the window.
    #[must_use]
    pub fn contains(&self, start_date: NaiveDate) -> bool {
        self.start <= start_date && start_date <= self.end
    }
}

impl Default for EligibilityWindow {
    fn default() -> Self {
        Self::scheme()
    }
}

/// A payment the apprentice is entitled to, before it is placed in the calendar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CandidatePayment {
    /// Milestone this payment belongs to
    pub earning_type: EarningType,
    /// Amount owed
    pub amount: Decimal,
    /// Start date plus the milestone offset
    pub due_date: NaiveDate,
}

/// Outcome of the eligibility calculation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Incentive {
    /// Whether the start date qualifies
    pub is_eligible: bool,
    /// Age bracket the apprentice falls into on the start date
    pub incentive_type: IncentiveType,
    /// Empty when ineligible, otherwise first then second payment
    pub payments: SmallVec<[CandidatePayment; 2]>,
}

impl Incentive {
    /// Computes eligibility, age bracket and candidate payments.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ProfileNotFound`] when the apprentice is eligible but
    /// the profile table has no entry for their age bracket.
    pub fn calculate(
        date_of_birth: NaiveDate,
        start_date: NaiveDate,
        profiles: &[IncentivePaymentProfile],
        window: &EligibilityWindow,
    ) -> Result<Self> {
        let incentive_type = IncentiveType::for_age(age_at(date_of_birth, start_date));

        if !window.contains(start_date) {
            return Ok(Self {
                is_eligible: false,
                incentive_type,
                payments: SmallVec::new(),
            });
        }

        let profile = profiles
            .iter()
            .find(|p| p.incentive_type == incentive_type)
            .ok_or(DomainError::ProfileNotFound(incentive_type))?;

        let payments = EarningType::ALL
            .iter()
            .zip(profile.profiles.iter())
            .map(|(earning_type, milestone)| CandidatePayment {
                earning_type: *earning_type,
                amount: milestone.amount,
                due_date: add_days(start_date, milestone.days_after_start),
            })
            .collect();

        Ok(Self {
            is_eligible: true,
            incentive_type,
            payments,
        })
    }
}

/// Whole years between `date_of_birth` and `on`, counting a birthday reached on `on`.
#[must_use]
pub fn age_at(date_of_birth: NaiveDate, on: NaiveDate) -> u32 {
    if on < date_of_birth {
        return 0;
    }

    let mut years = on.year() - date_of_birth.year();
    if (on.month(), on.day()) < (date_of_birth.month(), date_of_birth.day()) {
        years -= 1;
    }

    u32::try_from(years).unwrap_or(0)
}

fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}
