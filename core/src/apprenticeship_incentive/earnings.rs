//! Earnings reconciliation.
//!
//! Recalculation compares the current entitlement with the pending payments
//! already on the incentive and brings the two in line:
//!
//! | existing record          | entitlement                  | result                          |
//! |--------------------------|------------------------------|---------------------------------|
//! | none                     | candidate                    | new pending payment             |
//! | any                      | same due date and amount     | untouched                       |
//! | unpaid                   | changed or gone              | removed (replaced if changed)   |
//! | paid                     | same amount, same period     | untouched                       |
//! | paid                     | changed or gone              | clawed back (replaced if changed) |
//!
//! The work happens on copies of the child collections, which replace the
//! originals only once every candidate has been placed in the calendar.

use super::payments::{ClawbackPayment, Payment, PendingPayment};
use super::ApprenticeshipIncentive;
use crate::calendar::CollectionCalendar;
use crate::error::Result;
use crate::event::DomainEvent;
use crate::ids::{ClawbackPaymentId, PendingPaymentId};
use crate::incentive::{EarningType, EligibilityWindow, Incentive, IncentivePaymentProfile};

/// Summary of one recalculation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EarningsOutcome {
    /// Whether the start date qualifies for the incentive
    pub is_eligible: bool,
    /// Pending payments created
    pub pending_payments_created: usize,
    /// Unpaid pending payments removed
    pub pending_payments_removed: usize,
    /// Clawbacks created
    pub clawbacks_created: usize,
}

struct PaymentLedger {
    pending: Vec<PendingPayment>,
    payments: Vec<Payment>,
    clawbacks: Vec<ClawbackPayment>,
    outcome: EarningsOutcome,
}

impl PaymentLedger {
    fn current(&self, earning_type: EarningType) -> Option<PendingPayment> {
        self.pending
            .iter()
            .find(|p| !p.clawed_back && p.earning_type == earning_type)
            .cloned()
    }

    fn paid_payment(&self, pending_payment_id: PendingPaymentId) -> Option<&Payment> {
        self.payments
            .iter()
            .find(|p| p.pending_payment_id == pending_payment_id && p.is_paid())
    }

    fn add(&mut self, pending: PendingPayment) {
        self.pending.push(pending);
        self.outcome.pending_payments_created += 1;
    }

    /// Drops an unpaid pending payment together with any unpaid payment raised
    /// against it.
    fn remove(&mut self, pending_payment_id: PendingPaymentId) {
        self.pending.retain(|p| p.id != pending_payment_id);
        self.payments
            .retain(|p| p.pending_payment_id != pending_payment_id);
        self.outcome.pending_payments_removed += 1;
    }

    /// Marks a paid pending payment clawed back and reverses the payment, at
    /// most once per pending payment.
    fn claw_back(
        &mut self,
        pending_payment_id: PendingPaymentId,
        calendar: &CollectionCalendar,
    ) -> Result<()> {
        if let Some(pending) = self
            .pending
            .iter_mut()
            .find(|p| p.id == pending_payment_id)
        {
            pending.clawed_back = true;
        }

        if self
            .clawbacks
            .iter()
            .any(|c| c.pending_payment_id == pending_payment_id)
        {
            return Ok(());
        }

        let Some(payment) = self.paid_payment(pending_payment_id) else {
            return Ok(());
        };
        let active = calendar.get_active_period()?;

        let clawback = ClawbackPayment {
            id: ClawbackPaymentId::new(),
            account: payment.account,
            pending_payment_id,
            payment_id: payment.id,
            amount: -payment.amount.abs(),
            subnominal_code: payment.subnominal_code,
            collection_period: active.period_number,
            collection_period_year: active.academic_year,
        };
        self.clawbacks.push(clawback);
        self.outcome.clawbacks_created += 1;
        Ok(())
    }

    /// Takes an existing record out of play: clawed back if paid, removed otherwise.
    fn retire(
        &mut self,
        pending_payment_id: PendingPaymentId,
        calendar: &CollectionCalendar,
    ) -> Result<()> {
        if self.paid_payment(pending_payment_id).is_some() {
            self.claw_back(pending_payment_id, calendar)
        } else {
            self.remove(pending_payment_id);
            Ok(())
        }
    }
}

impl ApprenticeshipIncentive {
    /// Recalculates earnings against the scheme's eligibility window.
    ///
    /// # Errors
    ///
    /// See [`ApprenticeshipIncentive::calculate_earnings_within`].
    pub fn calculate_earnings(
        &mut self,
        calendar: &CollectionCalendar,
        profiles: &[IncentivePaymentProfile],
    ) -> Result<EarningsOutcome> {
        self.calculate_earnings_within(calendar, profiles, &EligibilityWindow::scheme())
    }

    /// Reconciles pending payments with the current entitlement.
    ///
    /// Uses the aggregate's current date of birth and start date, clears the
    /// learner-refreshed flag and raises exactly one `EarningsCalculated` event,
    /// whether or not anything changed.
    ///
    /// # Errors
    ///
    /// - [`DomainError::PeriodNotFound`](crate::DomainError::PeriodNotFound) when a
    ///   due date falls before every period in the calendar.
    /// - [`DomainError::NoActivePeriod`](crate::DomainError::NoActivePeriod) when a
    ///   clawback is needed and no period is active.
    /// - [`DomainError::ProfileNotFound`](crate::DomainError::ProfileNotFound) when
    ///   the profile table lacks the apprentice's age bracket.
    ///
    /// On error the aggregate is left exactly as it was.
    pub fn calculate_earnings_within(
        &mut self,
        calendar: &CollectionCalendar,
        profiles: &[IncentivePaymentProfile],
        window: &EligibilityWindow,
    ) -> Result<EarningsOutcome> {
        let incentive = Incentive::calculate(
            self.apprenticeship.date_of_birth,
            self.start_date,
            profiles,
            window,
        )?;

        let mut ledger = PaymentLedger {
            pending: self.pending_payments.clone(),
            payments: self.payments.clone(),
            clawbacks: self.clawback_payments.clone(),
            outcome: EarningsOutcome {
                is_eligible: incentive.is_eligible,
                ..EarningsOutcome::default()
            },
        };

        let orphaned: Vec<PendingPaymentId> = ledger
            .pending
            .iter()
            .filter(|p| {
                !p.clawed_back
                    && !incentive
                        .payments
                        .iter()
                        .any(|c| c.earning_type == p.earning_type)
            })
            .map(|p| p.id)
            .collect();
        for pending_payment_id in orphaned {
            ledger.retire(pending_payment_id, calendar)?;
        }

        for candidate in &incentive.payments {
            let period = calendar.get_period_for_date(candidate.due_date)?;
            let Some(existing) = ledger.current(candidate.earning_type) else {
                ledger.add(PendingPayment::schedule(self.account, candidate, period));
                continue;
            };

            if existing.matches(candidate) {
                continue;
            }

            if ledger.paid_payment(existing.id).is_some() {
                if existing.amount == candidate.amount && existing.is_in(period) {
                    continue;
                }
                ledger.claw_back(existing.id, calendar)?;
            } else {
                ledger.remove(existing.id);
            }
            ledger.add(PendingPayment::schedule(self.account, candidate, period));
        }

        ledger.pending.sort_by_key(|p| p.earning_type);

        self.pending_payments = ledger.pending;
        self.payments = ledger.payments;
        self.clawback_payments = ledger.clawbacks;
        self.refreshed_learner_for_earnings = false;
        self.events.push(DomainEvent::EarningsCalculated {
            apprenticeship_incentive_id: self.id,
            account_id: self.account.id,
            apprenticeship_id: self.apprenticeship.id,
            application_apprenticeship_id: self.application_apprenticeship_id,
        });

        Ok(ledger.outcome)
    }
}
