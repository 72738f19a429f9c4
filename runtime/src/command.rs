//! Commands accepted by the pipeline.
//!
//! A command names the aggregate it mutates through its lock id. Commands
//! against the same incentive share `"ApprenticeshipIncentive_{id}"`, so the lock
//! decorator serializes them across every process.

use chrono::NaiveDate;
use employer_incentives_core::ids::{ApprenticeshipIncentiveId, PaymentId, PendingPaymentId};

/// A request to mutate one aggregate.
pub trait Command: Send + Sync + 'static {
    /// Stable name used in logs and metrics.
    fn command_type(&self) -> &'static str;

    /// Name of the distributed lock to hold while handling, if any.
    fn lock_id(&self) -> Option<String> {
        None
    }

    /// Human-readable description for the logging decorator.
    fn describe(&self) -> Option<String> {
        None
    }
}

fn incentive_lock(id: ApprenticeshipIncentiveId) -> String {
    format!("ApprenticeshipIncentive_{id}")
}

/// Recalculate an incentive's earnings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalculateEarningsCommand {
    /// Incentive to recalculate
    pub apprenticeship_incentive_id: ApprenticeshipIncentiveId,
    /// Employer account
    pub account_id: i64,
    /// Apprenticeship the incentive is for
    pub apprenticeship_id: i64,
}

impl Command for CalculateEarningsCommand {
    fn command_type(&self) -> &'static str {
        "CalculateEarnings"
    }

    fn lock_id(&self) -> Option<String> {
        Some(incentive_lock(self.apprenticeship_incentive_id))
    }

    fn describe(&self) -> Option<String> {
        Some(format!(
            "Calculate earnings for incentive {} (account {}, apprenticeship {})",
            self.apprenticeship_incentive_id, self.account_id, self.apprenticeship_id
        ))
    }
}

/// Move an incentive's start date.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetStartDateCommand {
    /// Incentive to update
    pub apprenticeship_incentive_id: ApprenticeshipIncentiveId,
    /// New start date
    pub start_date: NaiveDate,
}

impl Command for SetStartDateCommand {
    fn command_type(&self) -> &'static str {
        "SetStartDate"
    }

    fn lock_id(&self) -> Option<String> {
        Some(incentive_lock(self.apprenticeship_incentive_id))
    }

    fn describe(&self) -> Option<String> {
        Some(format!(
            "Set start date of incentive {} to {}",
            self.apprenticeship_incentive_id, self.start_date
        ))
    }
}

/// Raise a payment against a pending payment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatePaymentCommand {
    /// Incentive owning the pending payment
    pub apprenticeship_incentive_id: ApprenticeshipIncentiveId,
    /// Pending payment to pay
    pub pending_payment_id: PendingPaymentId,
    /// Collection year the payment is raised in
    pub collection_year: i16,
    /// Collection period the payment is raised in
    pub collection_period: u8,
}

impl Command for CreatePaymentCommand {
    fn command_type(&self) -> &'static str {
        "CreatePayment"
    }

    fn lock_id(&self) -> Option<String> {
        Some(incentive_lock(self.apprenticeship_incentive_id))
    }
}

/// Record that a payment has been sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordPaymentSentCommand {
    /// Incentive owning the payment
    pub apprenticeship_incentive_id: ApprenticeshipIncentiveId,
    /// Payment that was sent
    pub payment_id: PaymentId,
    /// Date the money left
    pub paid_date: NaiveDate,
}

impl Command for RecordPaymentSentCommand {
    fn command_type(&self) -> &'static str {
        "RecordPaymentSent"
    }

    fn lock_id(&self) -> Option<String> {
        Some(incentive_lock(self.apprenticeship_incentive_id))
    }
}

/// Whether to put payments on hold or take them off.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PauseAction {
    /// Put on hold
    Pause,
    /// Take off hold
    Resume,
}

/// Pause or resume an incentive's payments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PausePaymentsCommand {
    /// Incentive to update
    pub apprenticeship_incentive_id: ApprenticeshipIncentiveId,
    /// Pause or resume
    pub action: PauseAction,
}

impl Command for PausePaymentsCommand {
    fn command_type(&self) -> &'static str {
        "PausePayments"
    }

    fn lock_id(&self) -> Option<String> {
        Some(incentive_lock(self.apprenticeship_incentive_id))
    }

    fn describe(&self) -> Option<String> {
        let verb = match self.action {
            PauseAction::Pause => "Pause",
            PauseAction::Resume => "Resume",
        };
        Some(format!(
            "{verb} payments for incentive {}",
            self.apprenticeship_incentive_id
        ))
    }
}

/// Set a collection period's active flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivateCollectionPeriodCommand {
    /// Calendar year of the period
    pub calendar_year: i16,
    /// Period number
    pub period_number: u8,
    /// New flag value
    pub active: bool,
}

impl Command for ActivateCollectionPeriodCommand {
    fn command_type(&self) -> &'static str {
        "ActivateCollectionPeriod"
    }

    fn lock_id(&self) -> Option<String> {
        Some("CollectionCalendar".to_string())
    }

    fn describe(&self) -> Option<String> {
        Some(format!(
            "Set period {} of {} active = {}",
            self.period_number, self.calendar_year, self.active
        ))
    }
}

/// Register a legal entity on an employer account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddLegalEntityCommand {
    /// Employer account
    pub account_id: i64,
    /// Account-scoped legal entity id
    pub account_legal_entity_id: i64,
    /// Legal entity id
    pub legal_entity_id: i64,
    /// Legal entity name
    pub name: String,
}

impl Command for AddLegalEntityCommand {
    fn command_type(&self) -> &'static str {
        "AddLegalEntity"
    }

    fn lock_id(&self) -> Option<String> {
        Some(format!("Account_{}", self.account_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incentive_commands_share_the_incentive_lock() {
        let id = ApprenticeshipIncentiveId::new();
        let calculate = CalculateEarningsCommand {
            apprenticeship_incentive_id: id,
            account_id: 1,
            apprenticeship_id: 2,
        };
        let pause = PausePaymentsCommand {
            apprenticeship_incentive_id: id,
            action: PauseAction::Pause,
        };

        assert_eq!(calculate.lock_id(), Some(format!("ApprenticeshipIncentive_{id}")));
        assert_eq!(calculate.lock_id(), pause.lock_id());
    }

    #[test]
    fn calendar_and_account_commands_lock_their_own_entities() {
        let activate = ActivateCollectionPeriodCommand {
            calendar_year: 2021,
            period_number: 3,
            active: true,
        };
        let add = AddLegalEntityCommand {
            account_id: 42,
            account_legal_entity_id: 7,
            legal_entity_id: 8,
            name: "Acme".to_string(),
        };

        assert_eq!(activate.lock_id().as_deref(), Some("CollectionCalendar"));
        assert_eq!(add.lock_id().as_deref(), Some("Account_42"));
        assert!(add.describe().is_none());
    }
}
