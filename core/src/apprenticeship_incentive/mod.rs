//! The apprenticeship incentive aggregate.
//!
//! An [`ApprenticeshipIncentive`] owns the learner details, the start date and
//! every payment record raised for the incentive. Records are only ever changed
//! through the aggregate's methods; callers get copies through
//! [`ApprenticeshipIncentive::payments_view`].
//!
//! Mutations are synchronous and never touch storage. Each one appends
//! [`DomainEvent`]s that the repository flushes after a successful save.

mod earnings;
mod payments;

pub use earnings::EarningsOutcome;
pub use payments::{
    ClawbackPayment, Payment, PaymentsView, PendingPayment, SubnominalCode, ValidationResult,
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::apprenticeship::Apprenticeship;
use crate::error::{DomainError, Result};
use crate::event::DomainEvent;
use crate::ids::{
    AccountRef, ApplicationApprenticeshipId, ApprenticeshipIncentiveId, PaymentId,
    PendingPaymentId,
};
use crate::incentive::age_at;
use crate::services::Aggregate;

/// Persisted form of an incentive and all of its child records.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApprenticeshipIncentiveSnapshot {
    /// Aggregate id
    pub id: ApprenticeshipIncentiveId,
    /// Account paid
    pub account: AccountRef,
    /// Application-side apprenticeship record
    pub application_apprenticeship_id: ApplicationApprenticeshipId,
    /// Learner details
    pub apprenticeship: Apprenticeship,
    /// Apprenticeship start date
    pub start_date: NaiveDate,
    /// Date the application was submitted
    pub submitted_date: NaiveDate,
    /// Who submitted the application
    pub submitted_by_email: String,
    /// Payments are on hold
    pub pause_payments: bool,
    /// Learner data changed since the last earnings calculation
    pub refreshed_learner_for_earnings: bool,
    /// Entitlements
    pub pending_payments: Vec<PendingPayment>,
    /// Payments raised
    pub payments: Vec<Payment>,
    /// Reversals
    pub clawback_payments: Vec<ClawbackPayment>,
}

/// Aggregate root for one apprentice's incentive.
#[derive(Clone, Debug)]
pub struct ApprenticeshipIncentive {
    id: ApprenticeshipIncentiveId,
    account: AccountRef,
    application_apprenticeship_id: ApplicationApprenticeshipId,
    apprenticeship: Apprenticeship,
    start_date: NaiveDate,
    submitted_date: NaiveDate,
    submitted_by_email: String,
    pause_payments: bool,
    refreshed_learner_for_earnings: bool,
    pending_payments: Vec<PendingPayment>,
    payments: Vec<Payment>,
    clawback_payments: Vec<ClawbackPayment>,
    is_new: bool,
    events: Vec<DomainEvent>,
}

impl ApprenticeshipIncentive {
    /// Creates a new incentive with no payment records.
    ///
    /// Raises `ApprenticeshipIncentiveCreated`.
    #[must_use]
    pub fn new(
        id: ApprenticeshipIncentiveId,
        account: AccountRef,
        application_apprenticeship_id: ApplicationApprenticeshipId,
        apprenticeship: Apprenticeship,
        start_date: NaiveDate,
        submitted_date: NaiveDate,
        submitted_by_email: impl Into<String>,
    ) -> Self {
        let created = DomainEvent::ApprenticeshipIncentiveCreated {
            apprenticeship_incentive_id: id,
            account_id: account.id,
            apprenticeship_id: apprenticeship.id,
            application_apprenticeship_id,
        };

        Self {
            id,
            account,
            application_apprenticeship_id,
            apprenticeship,
            start_date,
            submitted_date,
            submitted_by_email: submitted_by_email.into(),
            pause_payments: false,
            refreshed_learner_for_earnings: false,
            pending_payments: Vec::new(),
            payments: Vec::new(),
            clawback_payments: Vec::new(),
            is_new: true,
            events: vec![created],
        }
    }

    /// Rebuilds a persisted incentive. No events are raised.
    #[must_use]
    pub fn from_snapshot(snapshot: ApprenticeshipIncentiveSnapshot) -> Self {
        Self {
            id: snapshot.id,
            account: snapshot.account,
            application_apprenticeship_id: snapshot.application_apprenticeship_id,
            apprenticeship: snapshot.apprenticeship,
            start_date: snapshot.start_date,
            submitted_date: snapshot.submitted_date,
            submitted_by_email: snapshot.submitted_by_email,
            pause_payments: snapshot.pause_payments,
            refreshed_learner_for_earnings: snapshot.refreshed_learner_for_earnings,
            pending_payments: snapshot.pending_payments,
            payments: snapshot.payments,
            clawback_payments: snapshot.clawback_payments,
            is_new: false,
            events: Vec::new(),
        }
    }

    /// Copies the aggregate into its persisted form.
    #[must_use]
    pub fn to_snapshot(&self) -> ApprenticeshipIncentiveSnapshot {
        ApprenticeshipIncentiveSnapshot {
            id: self.id,
            account: self.account,
            application_apprenticeship_id: self.application_apprenticeship_id,
            apprenticeship: self.apprenticeship.clone(),
            start_date: self.start_date,
            submitted_date: self.submitted_date,
            submitted_by_email: self.submitted_by_email.clone(),
            pause_payments: self.pause_payments,
            refreshed_learner_for_earnings: self.refreshed_learner_for_earnings,
            pending_payments: self.pending_payments.clone(),
            payments: self.payments.clone(),
            clawback_payments: self.clawback_payments.clone(),
        }
    }

    /// Aggregate id.
    #[must_use]
    pub const fn id(&self) -> ApprenticeshipIncentiveId {
        self.id
    }

    /// Account the incentive is paid to.
    #[must_use]
    pub const fn account(&self) -> AccountRef {
        self.account
    }

    /// Application-side apprenticeship record.
    #[must_use]
    pub const fn application_apprenticeship_id(&self) -> ApplicationApprenticeshipId {
        self.application_apprenticeship_id
    }

    /// Learner details.
    #[must_use]
    pub const fn apprenticeship(&self) -> &Apprenticeship {
        &self.apprenticeship
    }

    /// Apprenticeship start date.
    #[must_use]
    pub const fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Date the application was submitted.
    #[must_use]
    pub const fn submitted_date(&self) -> NaiveDate {
        self.submitted_date
    }

    /// Who submitted the application.
    #[must_use]
    pub fn submitted_by_email(&self) -> &str {
        &self.submitted_by_email
    }

    /// Whether payments are on hold.
    #[must_use]
    pub const fn payments_paused(&self) -> bool {
        self.pause_payments
    }

    /// Whether learner data changed since earnings were last calculated.
    #[must_use]
    pub const fn refreshed_learner_for_earnings(&self) -> bool {
        self.refreshed_learner_for_earnings
    }

    /// Entitlements, including clawed back history.
    #[must_use]
    pub fn pending_payments(&self) -> &[PendingPayment] {
        &self.pending_payments
    }

    /// Payments raised.
    #[must_use]
    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    /// Reversals.
    #[must_use]
    pub fn clawback_payments(&self) -> &[ClawbackPayment] {
        &self.clawback_payments
    }

    /// Events raised since the last flush.
    #[must_use]
    pub fn pending_events(&self) -> &[DomainEvent] {
        &self.events
    }

    /// Snapshot of the payment records for reporting.
    #[must_use]
    pub fn payments_view(&self) -> PaymentsView {
        PaymentsView {
            pending_payments: self.pending_payments.clone(),
            payments: self.payments.clone(),
            clawback_payments: self.clawback_payments.clone(),
        }
    }

    /// Moves the start date.
    ///
    /// Raises `StartDateChanged` when the date differs; the same date is a no-op.
    pub fn set_start_date(&mut self, start_date: NaiveDate) {
        if start_date == self.start_date {
            return;
        }

        let previous_start_date = self.start_date;
        self.start_date = start_date;
        self.events.push(DomainEvent::StartDateChanged {
            apprenticeship_incentive_id: self.id,
            previous_start_date,
            new_start_date: start_date,
        });
    }

    /// Replaces the learner details and flags earnings for recalculation.
    pub fn set_apprenticeship(&mut self, apprenticeship: Apprenticeship) {
        self.apprenticeship = apprenticeship;
        self.refreshed_learner_for_earnings = true;
    }

    /// Puts payments on hold.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::RuleViolation`] if payments are already paused.
    pub fn pause_payments(&mut self) -> Result<()> {
        if self.pause_payments {
            return Err(DomainError::RuleViolation(format!(
                "payments for incentive {} are already paused",
                self.id
            )));
        }

        self.pause_payments = true;
        self.events.push(DomainEvent::PaymentsPaused {
            apprenticeship_incentive_id: self.id,
        });
        Ok(())
    }

    /// Takes payments off hold.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::RuleViolation`] if payments are not paused.
    pub fn resume_payments(&mut self) -> Result<()> {
        if !self.pause_payments {
            return Err(DomainError::RuleViolation(format!(
                "payments for incentive {} are not paused",
                self.id
            )));
        }

        self.pause_payments = false;
        self.events.push(DomainEvent::PaymentsResumed {
            apprenticeship_incentive_id: self.id,
        });
        Ok(())
    }

    /// Raises a payment against a pending payment, replacing any unpaid payment
    /// already raised for it.
    ///
    /// # Errors
    ///
    /// - [`DomainError::PendingPaymentNotFound`] if no such pending payment exists.
    /// - [`DomainError::RuleViolation`] if it has been clawed back or already paid.
    pub fn create_payment(
        &mut self,
        pending_payment_id: PendingPaymentId,
        collection_year: i16,
        collection_period: u8,
    ) -> Result<PaymentId> {
        let pending = self
            .pending_payments
            .iter()
            .find(|p| p.id == pending_payment_id)
            .ok_or(DomainError::PendingPaymentNotFound(pending_payment_id))?;

        if pending.clawed_back {
            return Err(DomainError::RuleViolation(format!(
                "pending payment {pending_payment_id} has been clawed back"
            )));
        }
        if self
            .payments
            .iter()
            .any(|p| p.pending_payment_id == pending_payment_id && p.is_paid())
        {
            return Err(DomainError::RuleViolation(format!(
                "pending payment {pending_payment_id} has already been paid"
            )));
        }

        let payment = Payment {
            id: PaymentId::new(),
            account: pending.account,
            pending_payment_id,
            amount: pending.amount,
            payment_year: collection_year,
            payment_period: collection_period,
            subnominal_code: self.subnominal_code(),
            paid_date: None,
        };
        let payment_id = payment.id;

        self.payments
            .retain(|p| p.pending_payment_id != pending_payment_id);
        self.payments.push(payment);
        self.events.push(DomainEvent::PaymentCreated {
            apprenticeship_incentive_id: self.id,
            pending_payment_id,
            payment_id,
        });

        Ok(payment_id)
    }

    /// Records that a payment has been sent.
    ///
    /// # Errors
    ///
    /// - [`DomainError::PaymentNotFound`] if no such payment exists.
    /// - [`DomainError::PaymentAlreadySent`] if it already has a paid date.
    pub fn record_payment_sent(&mut self, payment_id: PaymentId, paid_date: NaiveDate) -> Result<()> {
        let payment = self
            .payments
            .iter_mut()
            .find(|p| p.id == payment_id)
            .ok_or(DomainError::PaymentNotFound(payment_id))?;

        if payment.is_paid() {
            return Err(DomainError::PaymentAlreadySent(payment_id));
        }

        payment.paid_date = Some(paid_date);
        self.events.push(DomainEvent::PaymentSent {
            apprenticeship_incentive_id: self.id,
            payment_id,
            paid_date,
        });
        Ok(())
    }

    /// Attaches a validation outcome to a pending payment.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::PendingPaymentNotFound`] if no such pending payment exists.
    pub fn add_validation_result(
        &mut self,
        pending_payment_id: PendingPaymentId,
        result: ValidationResult,
    ) -> Result<()> {
        let pending = self
            .pending_payments
            .iter_mut()
            .find(|p| p.id == pending_payment_id)
            .ok_or(DomainError::PendingPaymentNotFound(pending_payment_id))?;

        pending.validation_results.retain(|r| {
            !(r.step == result.step
                && r.period_number == result.period_number
                && r.calendar_year == result.calendar_year)
        });
        pending.validation_results.push(result);
        Ok(())
    }

    fn subnominal_code(&self) -> SubnominalCode {
        SubnominalCode::for_learner(
            self.apprenticeship.employer_type,
            age_at(self.apprenticeship.date_of_birth, self.start_date),
        )
    }
}

impl Aggregate for ApprenticeshipIncentive {
    type Id = ApprenticeshipIncentiveId;

    const KIND: &'static str = "ApprenticeshipIncentive";

    fn id(&self) -> Self::Id {
        self.id
    }

    fn is_new(&self) -> bool {
        self.is_new
    }

    fn mark_persisted(&mut self) {
        self.is_new = false;
    }

    fn flush_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::apprenticeship::EmployerType;
    use crate::event::Event;
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn incentive() -> ApprenticeshipIncentive {
        ApprenticeshipIncentive::new(
            ApprenticeshipIncentiveId::new(),
            AccountRef::new(10, 20),
            ApplicationApprenticeshipId::new(),
            Apprenticeship::new(
                30,
                "Ada",
                "Lovelace",
                date(2002, 5, 1),
                4_000_000_001,
                EmployerType::NonLevy,
            ),
            date(2020, 10, 1),
            date(2020, 11, 1),
            "ada@example.com",
        )
    }

    fn with_pending(incentive: &mut ApprenticeshipIncentive) -> PendingPaymentId {
        let pending = PendingPayment {
            id: PendingPaymentId::new(),
            account: incentive.account,
            due_date: date(2020, 12, 30),
            amount: Decimal::from(1000),
            period_number: 5,
            payment_year: 2021,
            earning_type: crate::incentive::EarningType::FirstPayment,
            clawed_back: false,
            validation_results: Vec::new(),
        };
        let id = pending.id;
        incentive.pending_payments.push(pending);
        id
    }

    #[test]
    fn new_incentive_raises_created_event() {
        let mut incentive = incentive();
        assert!(incentive.is_new());

        let events = incentive.flush_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "ApprenticeshipIncentiveCreated.v1");
        assert!(incentive.flush_events().is_empty());
    }

    #[test]
    fn snapshot_round_trip_keeps_records_and_drops_events() {
        let mut original = incentive();
        with_pending(&mut original);

        let restored = ApprenticeshipIncentive::from_snapshot(original.to_snapshot());

        assert!(!restored.is_new());
        assert!(restored.pending_events().is_empty());
        assert_eq!(restored.pending_payments(), original.pending_payments());
    }

    #[test]
    fn changing_the_start_date_raises_an_event_once() {
        let mut incentive = incentive();
        incentive.flush_events();

        incentive.set_start_date(date(2020, 10, 1));
        assert!(incentive.pending_events().is_empty());

        incentive.set_start_date(date(2020, 11, 15));
        assert_eq!(incentive.start_date(), date(2020, 11, 15));
        assert_eq!(
            incentive.flush_events(),
            vec![DomainEvent::StartDateChanged {
                apprenticeship_incentive_id: incentive.id(),
                previous_start_date: date(2020, 10, 1),
                new_start_date: date(2020, 11, 15),
            }]
        );
    }

    #[test]
    fn pausing_twice_is_a_rule_violation() {
        let mut incentive = incentive();
        incentive.pause_payments().unwrap();
        assert!(incentive.payments_paused());
        assert!(matches!(
            incentive.pause_payments(),
            Err(DomainError::RuleViolation(_))
        ));

        incentive.resume_payments().unwrap();
        assert!(matches!(
            incentive.resume_payments(),
            Err(DomainError::RuleViolation(_))
        ));
    }

    #[test]
    fn refreshing_the_learner_flags_earnings() {
        let mut incentive = incentive();
        let mut apprenticeship = incentive.apprenticeship().clone();
        apprenticeship.date_of_birth = date(1990, 1, 1);

        incentive.set_apprenticeship(apprenticeship);

        assert!(incentive.refreshed_learner_for_earnings());
        assert_eq!(incentive.apprenticeship().date_of_birth, date(1990, 1, 1));
    }

    #[test]
    fn create_payment_replaces_an_unpaid_payment() {
        let mut incentive = incentive();
        let pending_id = with_pending(&mut incentive);

        let first = incentive.create_payment(pending_id, 2021, 5).unwrap();
        let second = incentive.create_payment(pending_id, 2021, 6).unwrap();

        assert_ne!(first, second);
        assert_eq!(incentive.payments().len(), 1);
        assert_eq!(incentive.payments()[0].payment_period, 6);
        assert_eq!(
            incentive.payments()[0].subnominal_code,
            SubnominalCode::NonLevy16To18
        );
    }

    #[test]
    fn a_paid_payment_cannot_be_raised_again_or_resent() {
        let mut incentive = incentive();
        let pending_id = with_pending(&mut incentive);
        let payment_id = incentive.create_payment(pending_id, 2021, 5).unwrap();

        incentive
            .record_payment_sent(payment_id, date(2021, 1, 10))
            .unwrap();

        assert_eq!(
            incentive.record_payment_sent(payment_id, date(2021, 1, 11)),
            Err(DomainError::PaymentAlreadySent(payment_id))
        );
        assert!(matches!(
            incentive.create_payment(pending_id, 2021, 6),
            Err(DomainError::RuleViolation(_))
        ));
        assert_eq!(incentive.payments_view().sent().count(), 1);
    }

    #[test]
    fn unknown_records_are_reported() {
        let mut incentive = incentive();
        let missing_pending = PendingPaymentId::new();
        let missing_payment = PaymentId::new();

        assert_eq!(
            incentive.create_payment(missing_pending, 2021, 1),
            Err(DomainError::PendingPaymentNotFound(missing_pending))
        );
        assert_eq!(
            incentive.record_payment_sent(missing_payment, date(2021, 1, 1)),
            Err(DomainError::PaymentNotFound(missing_payment))
        );
    }

    #[test]
    fn validation_results_replace_the_same_step_in_the_same_period() {
        let mut incentive = incentive();
        let pending_id = with_pending(&mut incentive);
        let check = |result| ValidationResult {
            step: "HasBankDetails".to_string(),
            period_number: 5,
            calendar_year: 2020,
            result,
        };

        incentive.add_validation_result(pending_id, check(false)).unwrap();
        incentive.add_validation_result(pending_id, check(true)).unwrap();

        let results = &incentive.pending_payments()[0].validation_results;
        assert_eq!(results.len(), 1);
        assert!(results[0].result);
    }
}
