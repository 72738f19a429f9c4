//! Fixture builders for domain tests.

#![allow(clippy::unwrap_used)] // Fixtures are built from known-good constants
#![allow(clippy::missing_panics_doc)]

use chrono::{Datelike, Months, NaiveDate};
use employer_incentives_core::calendar::{CollectionCalendar, CollectionPeriod};
use employer_incentives_core::incentive::{
    IncentivePaymentProfile, IncentiveType, PaymentProfile,
};
use employer_incentives_core::{
    AccountRef, ApplicationApprenticeshipId, Apprenticeship, ApprenticeshipIncentive,
    ApprenticeshipIncentiveId, EmployerType,
};
use rust_decimal::Decimal;

/// Shorthand for a calendar date.
#[must_use]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// One period per month from August 2020 to July 2022, each opening on the
/// first of its month, numbered from August = 1 within the academic year.
///
/// The period for `active` (year, month) is the active one.
#[must_use]
pub fn monthly_calendar(active: (i32, u32)) -> CollectionCalendar {
    let mut periods = Vec::new();
    let mut month_start = date(2020, 8, 1);
    while month_start < date(2022, 8, 1) {
        let (year, month) = (month_start.year(), month_start.month());
        let academic_year = if month >= 8 { year + 1 } else { year };
        let period_number = if month >= 8 { month - 7 } else { month + 5 };
        let mut period = CollectionPeriod::new(
            u8::try_from(period_number).unwrap(),
            u8::try_from(month).unwrap(),
            i16::try_from(year).unwrap(),
            i16::try_from(academic_year).unwrap(),
            month_start,
        );
        if (year, month) == active {
            period = period.activated();
        }
        periods.push(period);
        month_start = month_start.checked_add_months(Months::new(1)).unwrap();
    }
    CollectionCalendar::new(periods).unwrap()
}

/// The same two-milestone schedule (89 and 364 days) for both age brackets.
#[must_use]
pub fn payment_profiles(first: i64, second: i64) -> Vec<IncentivePaymentProfile> {
    [
        IncentiveType::UnderTwentyFiveIncentive,
        IncentiveType::TwentyFiveOrOverIncentive,
    ]
    .into_iter()
    .map(|incentive_type| {
        IncentivePaymentProfile::new(
            incentive_type,
            PaymentProfile::new(89, Decimal::from(first)),
            PaymentProfile::new(364, Decimal::from(second)),
        )
    })
    .collect()
}

/// Builds an [`ApprenticeshipIncentive`] with sensible defaults.
///
/// Defaults to a levy-paying employer, an apprentice born 1 January 2000 and a
/// start date of 1 October 2020 (inside the scheme window).
#[derive(Clone, Debug)]
pub struct IncentiveBuilder {
    id: ApprenticeshipIncentiveId,
    account: AccountRef,
    date_of_birth: NaiveDate,
    start_date: NaiveDate,
    employer_type: EmployerType,
}

impl IncentiveBuilder {
    /// Starts from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: ApprenticeshipIncentiveId::new(),
            account: AccountRef::new(1001, 2002),
            date_of_birth: date(2000, 1, 1),
            start_date: date(2020, 10, 1),
            employer_type: EmployerType::Levy,
        }
    }

    /// Uses a fixed id.
    #[must_use]
    pub const fn id(mut self, id: ApprenticeshipIncentiveId) -> Self {
        self.id = id;
        self
    }

    /// Sets the employer account.
    #[must_use]
    pub const fn account(mut self, account: AccountRef) -> Self {
        self.account = account;
        self
    }

    /// Sets the apprentice's date of birth.
    #[must_use]
    pub const fn date_of_birth(mut self, date_of_birth: NaiveDate) -> Self {
        self.date_of_birth = date_of_birth;
        self
    }

    /// Sets the apprenticeship start date.
    #[must_use]
    pub const fn start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = start_date;
        self
    }

    /// Sets the employer type.
    #[must_use]
    pub const fn employer_type(mut self, employer_type: EmployerType) -> Self {
        self.employer_type = employer_type;
        self
    }

    /// Creates the incentive. It is new and carries its creation event.
    #[must_use]
    pub fn build(self) -> ApprenticeshipIncentive {
        ApprenticeshipIncentive::new(
            self.id,
            self.account,
            ApplicationApprenticeshipId::new(),
            Apprenticeship::new(
                3003,
                "Alex",
                "Smith",
                self.date_of_birth,
                1_234_567_890,
                self.employer_type,
            )
            .with_course("Software Developer L4"),
            self.start_date,
            self.start_date,
            "employer@example.com",
        )
    }
}

impl Default for IncentiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}
