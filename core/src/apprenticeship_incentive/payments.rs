//! Child records of an apprenticeship incentive.
//!
//! Records compare by id: two pending payments with identical terms but different
//! ids are different entitlements.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::apprenticeship::EmployerType;
use crate::calendar::CollectionPeriod;
use crate::ids::{AccountRef, ClawbackPaymentId, PaymentId, PendingPaymentId};
use crate::incentive::{CandidatePayment, EarningType};

/// Outcome of one validation step run against a pending payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Name of the check (e.g. "HasBankDetails")
    pub step: String,
    /// Period number the check ran in
    pub period_number: u8,
    /// Calendar year of that period
    pub calendar_year: i16,
    /// Whether the check passed
    pub result: bool,
}

/// An entitlement that has not been disbursed yet.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingPayment {
    /// Record id
    pub id: PendingPaymentId,
    /// Account the money goes to
    pub account: AccountRef,
    /// Date the milestone is reached
    pub due_date: NaiveDate,
    /// Amount owed
    pub amount: Decimal,
    /// Period the due date falls in
    pub period_number: u8,
    /// Academic year of that period
    pub payment_year: i16,
    /// Milestone this entitlement is for
    pub earning_type: EarningType,
    /// Set once the payment made against this record has been reversed
    pub clawed_back: bool,
    /// Checks run before the payment is raised
    pub validation_results: Vec<ValidationResult>,
}

impl PendingPayment {
    /// Places a candidate payment into its collection period.
    #[must_use]
    pub fn schedule(
        account: AccountRef,
        candidate: &CandidatePayment,
        period: &CollectionPeriod,
    ) -> Self {
        Self {
            id: PendingPaymentId::new(),
            account,
            due_date: candidate.due_date,
            amount: candidate.amount,
            period_number: period.period_number,
            payment_year: period.academic_year,
            earning_type: candidate.earning_type,
            clawed_back: false,
            validation_results: Vec::new(),
        }
    }

    /// Same due date and amount as the candidate.
    #[must_use]
    pub fn matches(&self, candidate: &CandidatePayment) -> bool {
        self.due_date == candidate.due_date && self.amount == candidate.amount
    }

    /// Scheduled into the same period as `period`.
    #[must_use]
    pub fn is_in(&self, period: &CollectionPeriod) -> bool {
        self.period_number == period.period_number && self.payment_year == period.academic_year
    }
}

impl PartialEq for PendingPayment {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PendingPayment {}

/// Ledger code a payment is booked under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubnominalCode {
    /// Levy employer, learner aged 16 to 18
    Levy16To18,
    /// Levy employer, learner aged 19 or over
    Levy19Plus,
    /// Non-levy employer, learner aged 16 to 18
    NonLevy16To18,
    /// Non-levy employer, learner aged 19 or over
    NonLevy19Plus,
}

impl SubnominalCode {
    /// Code for the employer type and the learner's age on the start date.
    #[must_use]
    pub const fn for_learner(employer_type: EmployerType, age_at_start: u32) -> Self {
        match (employer_type, age_at_start < 19) {
            (EmployerType::Levy, true) => Self::Levy16To18,
            (EmployerType::Levy, false) => Self::Levy19Plus,
            (EmployerType::NonLevy, true) => Self::NonLevy16To18,
            (EmployerType::NonLevy, false) => Self::NonLevy19Plus,
        }
    }
}

/// Money raised against a pending payment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Payment {
    /// Record id
    pub id: PaymentId,
    /// Account the money goes to
    pub account: AccountRef,
    /// Entitlement this payment settles
    pub pending_payment_id: PendingPaymentId,
    /// Amount paid
    pub amount: Decimal,
    /// Collection year the payment was raised in
    pub payment_year: i16,
    /// Collection period the payment was raised in
    pub payment_period: u8,
    /// Ledger code
    pub subnominal_code: SubnominalCode,
    /// Set once the money has left
    pub paid_date: Option<NaiveDate>,
}

impl Payment {
    /// Whether the money has been sent.
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        self.paid_date.is_some()
    }
}

impl PartialEq for Payment {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Payment {}

/// Reversal of a payment whose entitlement changed after it was sent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClawbackPayment {
    /// Record id
    pub id: ClawbackPaymentId,
    /// Account the money is recovered from
    pub account: AccountRef,
    /// Entitlement being reversed
    pub pending_payment_id: PendingPaymentId,
    /// Payment being reversed
    pub payment_id: PaymentId,
    /// Always negative
    pub amount: Decimal,
    /// Ledger code of the reversed payment
    pub subnominal_code: SubnominalCode,
    /// Period the clawback is collected in
    pub collection_period: u8,
    /// Academic year of that period
    pub collection_period_year: i16,
}

impl PartialEq for ClawbackPayment {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ClawbackPayment {}

/// Read-only copy of an incentive's payment records.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PaymentsView {
    /// Entitlements, including clawed back ones
    pub pending_payments: Vec<PendingPayment>,
    /// Payments raised, paid or not
    pub payments: Vec<Payment>,
    /// Reversals
    pub clawback_payments: Vec<ClawbackPayment>,
}

impl PaymentsView {
    /// Payments that have been sent.
    pub fn sent(&self) -> impl Iterator<Item = &Payment> + '_ {
        self.payments.iter().filter(|p| p.is_paid())
    }

    /// Pending payments that still count towards the entitlement.
    pub fn outstanding(&self) -> impl Iterator<Item = &PendingPayment> + '_ {
        self.pending_payments.iter().filter(|p| !p.clawed_back)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn subnominal_code_splits_at_nineteen() {
        assert_eq!(
            SubnominalCode::for_learner(EmployerType::Levy, 18),
            SubnominalCode::Levy16To18
        );
        assert_eq!(
            SubnominalCode::for_learner(EmployerType::Levy, 19),
            SubnominalCode::Levy19Plus
        );
        assert_eq!(
            SubnominalCode::for_learner(EmployerType::NonLevy, 16),
            SubnominalCode::NonLevy16To18
        );
        assert_eq!(
            SubnominalCode::for_learner(EmployerType::NonLevy, 40),
            SubnominalCode::NonLevy19Plus
        );
    }

    #[test]
    fn pending_payments_compare_by_id() {
        let period = CollectionPeriod::new(
            1,
            8,
            2020,
            2021,
            NaiveDate::from_ymd_opt(2020, 8, 5).unwrap(),
        );
        let candidate = CandidatePayment {
            earning_type: EarningType::FirstPayment,
            amount: Decimal::from(1000),
            due_date: NaiveDate::from_ymd_opt(2020, 8, 20).unwrap(),
        };
        let account = AccountRef::new(1, 2);

        let first = PendingPayment::schedule(account, &candidate, &period);
        let second = PendingPayment::schedule(account, &candidate, &period);

        assert_ne!(first, second);
        assert_eq!(first, first.clone());
        assert!(first.matches(&candidate));
        assert!(first.is_in(&period));
    }
}
