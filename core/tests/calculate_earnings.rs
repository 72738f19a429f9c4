//! Earnings reconciliation scenarios.

#![allow(clippy::unwrap_used)]

use chrono::{Datelike, Duration, NaiveDate};
use employer_incentives_core::calendar::{CollectionCalendar, CollectionPeriod};
use employer_incentives_core::event::Event;
use employer_incentives_core::incentive::{
    EarningType, IncentivePaymentProfile, IncentiveType, PaymentProfile,
};
use employer_incentives_core::{
    AccountRef, Aggregate, ApplicationApprenticeshipId, Apprenticeship, ApprenticeshipIncentive,
    ApprenticeshipIncentiveId, DomainError, DomainEvent, EmployerType,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Monthly periods from August 2020 to July 2022, opening on the first of the
/// month, with the given month active.
fn monthly_calendar(active: (i32, u32)) -> CollectionCalendar {
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
        month_start = month_start
            .checked_add_months(chrono::Months::new(1))
            .unwrap();
    }
    CollectionCalendar::new(periods).unwrap()
}

fn profiles(first: i64, second: i64) -> Vec<IncentivePaymentProfile> {
    vec![
        IncentivePaymentProfile::new(
            IncentiveType::TwentyFiveOrOverIncentive,
            PaymentProfile::new(89, Decimal::from(first)),
            PaymentProfile::new(364, Decimal::from(second)),
        ),
        IncentivePaymentProfile::new(
            IncentiveType::UnderTwentyFiveIncentive,
            PaymentProfile::new(89, Decimal::from(first)),
            PaymentProfile::new(364, Decimal::from(second)),
        ),
    ]
}

fn incentive(date_of_birth: NaiveDate, start_date: NaiveDate) -> ApprenticeshipIncentive {
    let mut incentive = ApprenticeshipIncentive::new(
        ApprenticeshipIncentiveId::new(),
        AccountRef::new(100, 200),
        ApplicationApprenticeshipId::new(),
        Apprenticeship::new(
            300,
            "Jo",
            "Bloggs",
            date_of_birth,
            1_234_567_890,
            EmployerType::Levy,
        ),
        start_date,
        start_date,
        "jo@example.com",
    );
    incentive.flush_events();
    incentive
}

/// Raises and sends a payment for the pending payment of `earning_type`.
fn pay(incentive: &mut ApprenticeshipIncentive, earning_type: EarningType, paid: NaiveDate) {
    let pending = incentive
        .pending_payments()
        .iter()
        .find(|p| p.earning_type == earning_type && !p.clawed_back)
        .unwrap()
        .clone();
    let payment_id = incentive
        .create_payment(pending.id, pending.payment_year, pending.period_number)
        .unwrap();
    incentive.record_payment_sent(payment_id, paid).unwrap();
    incentive.flush_events();
}

#[test]
fn twenty_six_year_old_starting_end_of_january_gets_two_pending_payments() {
    let calendar = CollectionCalendar::new(vec![
        CollectionPeriod::new(5, 12, 2020, 2021, date(2020, 12, 1)),
        CollectionPeriod::new(7, 2, 2021, 2021, date(2021, 2, 1)).activated(),
        CollectionPeriod::new(8, 3, 2021, 2021, date(2021, 3, 1)),
    ])
    .unwrap();
    let profiles = vec![IncentivePaymentProfile::new(
        IncentiveType::TwentyFiveOrOverIncentive,
        PaymentProfile::new(90, Decimal::from(100)),
        PaymentProfile::new(100, Decimal::from(1000)),
    )];
    let mut incentive = incentive(date(1994, 6, 15), date(2021, 1, 30));

    incentive.calculate_earnings(&calendar, &profiles).unwrap();

    let pending = incentive.pending_payments();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].due_date, date(2021, 4, 30));
    assert_eq!(pending[0].amount, Decimal::from(100));
    assert_eq!(pending[1].due_date, date(2021, 5, 10));
    assert_eq!(pending[1].amount, Decimal::from(1000));
    assert!(pending.iter().all(|p| !p.clawed_back));
    assert!(pending.iter().all(|p| p.period_number == 8 && p.payment_year == 2021));

    let events = incentive.flush_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type(), "EarningsCalculated.v1");
}

#[test]
fn earnings_calculated_event_identifies_the_incentive() {
    let mut incentive = incentive(date(1990, 1, 1), date(2020, 10, 1));

    incentive
        .calculate_earnings(&monthly_calendar((2020, 10)), &profiles(1000, 1000))
        .unwrap();

    assert_eq!(
        incentive.flush_events(),
        vec![DomainEvent::EarningsCalculated {
            apprenticeship_incentive_id: incentive.id(),
            account_id: 100,
            apprenticeship_id: 300,
            application_apprenticeship_id: incentive.application_apprenticeship_id(),
        }]
    );
}

#[test]
fn recalculating_without_changes_keeps_every_record() {
    let calendar = monthly_calendar((2020, 10));
    let mut incentive = incentive(date(1990, 1, 1), date(2020, 10, 1));

    incentive
        .calculate_earnings(&calendar, &profiles(1000, 1000))
        .unwrap();
    let first = incentive.pending_payments().to_vec();

    let outcome = incentive
        .calculate_earnings(&calendar, &profiles(1000, 1000))
        .unwrap();

    assert_eq!(incentive.pending_payments(), first.as_slice());
    assert_eq!(outcome.pending_payments_created, 0);
    assert_eq!(outcome.pending_payments_removed, 0);
    assert_eq!(incentive.flush_events().len(), 2);
}

#[test]
fn start_date_outside_the_window_removes_unpaid_entitlements() {
    let calendar = monthly_calendar((2020, 10));
    let mut incentive = incentive(date(1990, 1, 1), date(2020, 10, 1));
    incentive
        .calculate_earnings(&calendar, &profiles(1000, 1000))
        .unwrap();
    let pending_id = incentive.pending_payments()[0].id;
    incentive.create_payment(pending_id, 2021, 5).unwrap();

    incentive.set_start_date(date(2021, 4, 1));
    let outcome = incentive
        .calculate_earnings(&calendar, &profiles(1000, 1000))
        .unwrap();

    assert!(!outcome.is_eligible);
    assert!(incentive.pending_payments().is_empty());
    assert!(incentive.payments().is_empty());
    assert!(incentive.clawback_payments().is_empty());
}

#[test]
fn changed_unpaid_entitlement_is_replaced_without_clawback() {
    let calendar = monthly_calendar((2020, 10));
    let mut incentive = incentive(date(1990, 1, 1), date(2020, 10, 1));
    incentive
        .calculate_earnings(&calendar, &profiles(1000, 1000))
        .unwrap();
    let original = incentive.pending_payments().to_vec();

    incentive
        .calculate_earnings(&calendar, &profiles(1500, 1000))
        .unwrap();

    let pending = incentive.pending_payments();
    assert_eq!(pending.len(), 2);
    assert_ne!(pending[0], original[0]);
    assert_eq!(pending[0].amount, Decimal::from(1500));
    assert_eq!(pending[1], original[1]);
    assert!(incentive.clawback_payments().is_empty());
}

#[test]
fn changed_paid_entitlement_is_clawed_back_exactly_once() {
    let calendar = monthly_calendar((2021, 2));
    let mut incentive = incentive(date(1990, 1, 1), date(2020, 10, 1));
    incentive
        .calculate_earnings(&calendar, &profiles(1000, 1000))
        .unwrap();
    pay(&mut incentive, EarningType::FirstPayment, date(2021, 1, 15));
    let paid = incentive.pending_payments()[0].clone();

    let outcome = incentive
        .calculate_earnings(&calendar, &profiles(1500, 1000))
        .unwrap();
    assert_eq!(outcome.clawbacks_created, 1);

    for amount in [1600, 1700, 1000] {
        incentive
            .calculate_earnings(&calendar, &profiles(amount, 1000))
            .unwrap();
    }

    let clawbacks = incentive.clawback_payments();
    assert_eq!(clawbacks.len(), 1);
    assert_eq!(clawbacks[0].pending_payment_id, paid.id);
    assert_eq!(clawbacks[0].amount, Decimal::from(-1000));
    assert_eq!(clawbacks[0].collection_period, 7);
    assert_eq!(clawbacks[0].collection_period_year, 2021);

    let history: Vec<_> = incentive
        .pending_payments()
        .iter()
        .filter(|p| p.earning_type == EarningType::FirstPayment)
        .collect();
    assert_eq!(history.len(), 2);
    assert!(history[0].clawed_back);
    assert_eq!(history[0].id, paid.id);
    assert!(!history[1].clawed_back);
    assert_eq!(history[1].amount, Decimal::from(1000));
}

#[test]
fn paid_entitlement_moving_within_its_period_is_not_clawed_back() {
    let calendar = monthly_calendar((2021, 2));
    let mut incentive = incentive(date(1990, 1, 1), date(2020, 10, 1));
    incentive
        .calculate_earnings(&calendar, &profiles(1000, 1000))
        .unwrap();
    pay(&mut incentive, EarningType::FirstPayment, date(2021, 1, 5));
    let paid = incentive.pending_payments()[0].clone();
    assert_eq!(paid.due_date, date(2020, 12, 29));

    incentive.set_start_date(date(2020, 9, 25));
    incentive
        .calculate_earnings(&calendar, &profiles(1000, 1000))
        .unwrap();

    assert!(incentive.clawback_payments().is_empty());
    let kept = &incentive.pending_payments()[0];
    assert_eq!(kept.id, paid.id);
    assert_eq!(kept.due_date, paid.due_date);
    assert!(!kept.clawed_back);
}

#[test]
fn paid_entitlement_moving_to_another_period_is_clawed_back() {
    let calendar = monthly_calendar((2021, 2));
    let mut incentive = incentive(date(1990, 1, 1), date(2020, 10, 1));
    incentive
        .calculate_earnings(&calendar, &profiles(1000, 1000))
        .unwrap();
    pay(&mut incentive, EarningType::FirstPayment, date(2021, 1, 5));

    incentive.set_start_date(date(2020, 11, 15));
    incentive
        .calculate_earnings(&calendar, &profiles(1000, 1000))
        .unwrap();

    assert_eq!(incentive.clawback_payments().len(), 1);
    let replacement = incentive
        .pending_payments()
        .iter()
        .find(|p| p.earning_type == EarningType::FirstPayment && !p.clawed_back)
        .unwrap();
    assert_eq!(replacement.due_date, date(2021, 2, 12));
    assert_eq!(replacement.period_number, 7);
}

#[test]
fn paid_entitlement_that_disappears_is_clawed_back() {
    let calendar = monthly_calendar((2021, 2));
    let mut incentive = incentive(date(1990, 1, 1), date(2020, 10, 1));
    incentive
        .calculate_earnings(&calendar, &profiles(1000, 1000))
        .unwrap();
    pay(&mut incentive, EarningType::FirstPayment, date(2021, 1, 5));

    incentive.set_start_date(date(2020, 7, 1));
    incentive
        .calculate_earnings(&calendar, &profiles(1000, 1000))
        .unwrap();

    assert_eq!(incentive.pending_payments().len(), 1);
    assert!(incentive.pending_payments()[0].clawed_back);
    assert_eq!(incentive.clawback_payments().len(), 1);
    assert_eq!(incentive.payments().len(), 1);
}

#[test]
fn unresolvable_due_date_leaves_the_incentive_untouched() {
    let calendar = CollectionCalendar::new(vec![
        CollectionPeriod::new(6, 1, 2021, 2021, date(2021, 1, 1)).activated(),
    ])
    .unwrap();
    let mut incentive = incentive(date(1990, 1, 1), date(2020, 8, 1));

    let result = incentive.calculate_earnings(&calendar, &profiles(1000, 1000));

    assert_eq!(
        result,
        Err(DomainError::PeriodNotFound {
            date: date(2020, 10, 29)
        })
    );
    assert!(incentive.pending_payments().is_empty());
    assert!(incentive.flush_events().is_empty());
}

#[test]
fn clawback_without_an_active_period_fails_without_partial_changes() {
    let mut calendar = monthly_calendar((2021, 2));
    let mut incentive = incentive(date(1990, 1, 1), date(2020, 10, 1));
    incentive
        .calculate_earnings(&calendar, &profiles(1000, 1000))
        .unwrap();
    pay(&mut incentive, EarningType::FirstPayment, date(2021, 1, 5));
    let before = incentive.pending_payments().to_vec();

    calendar.activate_period(2021, 7, false);
    let result = incentive.calculate_earnings(&calendar, &profiles(2000, 2000));

    assert_eq!(result, Err(DomainError::NoActivePeriod));
    assert_eq!(incentive.pending_payments(), before.as_slice());
    assert!(!incentive.pending_payments()[0].clawed_back);
    assert!(incentive.clawback_payments().is_empty());
}

#[test]
fn recalculation_clears_the_learner_refreshed_flag() {
    let mut incentive = incentive(date(1990, 1, 1), date(2020, 10, 1));
    let mut apprenticeship = incentive.apprenticeship().clone();
    apprenticeship.date_of_birth = date(2000, 1, 1);
    incentive.set_apprenticeship(apprenticeship);
    assert!(incentive.refreshed_learner_for_earnings());

    incentive
        .calculate_earnings(&monthly_calendar((2020, 10)), &profiles(1000, 1000))
        .unwrap();

    assert!(!incentive.refreshed_learner_for_earnings());
}

proptest! {
    #[test]
    fn recalculation_is_idempotent(day in 0_i64..243, age in 16_i32..60) {
        let calendar = monthly_calendar((2020, 10));
        let start = date(2020, 8, 1) + Duration::days(day);
        let mut incentive = incentive(date(2020 - age, 3, 1), start);

        incentive.calculate_earnings(&calendar, &profiles(1000, 1000)).unwrap();
        let first: Vec<_> = incentive
            .pending_payments()
            .iter()
            .map(|p| (p.id, p.due_date, p.amount, p.period_number, p.payment_year, p.clawed_back))
            .collect();

        incentive.calculate_earnings(&calendar, &profiles(1000, 1000)).unwrap();
        let second: Vec<_> = incentive
            .pending_payments()
            .iter()
            .map(|p| (p.id, p.due_date, p.amount, p.period_number, p.payment_year, p.clawed_back))
            .collect();

        prop_assert_eq!(first.len(), 2);
        prop_assert_eq!(first, second);
    }
}
