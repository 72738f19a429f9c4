use employer_incentives_core::incentive::EligibilityWindow;
use employer_incentives_core::services::{
    CollectionCalendarService, DomainRepository, IncentivePaymentProfilesService,
};
use employer_incentives_core::ApprenticeshipIncentive;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::load;
use crate::command::{
    CalculateEarningsCommand, CreatePaymentCommand, PauseAction, PausePaymentsCommand,
    RecordPaymentSentCommand, SetStartDateCommand,
};
use crate::handler::{CommandHandler, HandlerFuture};
use crate::metrics::IncentiveMetrics;

/// Recalculates an incentive's earnings.
pub struct CalculateEarningsHandler<R, S, P> {
    repository: Arc<R>,
    calendar: Arc<S>,
    profiles: Arc<P>,
    window: EligibilityWindow,
}

impl<R, S, P> CalculateEarningsHandler<R, S, P> {
    /// Creates the handler, using the scheme's eligibility window.
    #[must_use]
    pub fn new(repository: Arc<R>, calendar: Arc<S>, profiles: Arc<P>) -> Self {
        Self {
            repository,
            calendar,
            profiles,
            window: EligibilityWindow::scheme(),
        }
    }

    /// Overrides the eligibility window.
    #[must_use]
    pub const fn with_window(mut self, window: EligibilityWindow) -> Self {
        self.window = window;
        self
    }
}

impl<R, S, P> CommandHandler<CalculateEarningsCommand> for CalculateEarningsHandler<R, S, P>
where
    R: DomainRepository<ApprenticeshipIncentive>,
    S: CollectionCalendarService,
    P: IncentivePaymentProfilesService,
{
    fn handle<'a>(
        &'a self,
        command: &'a CalculateEarningsCommand,
        _cancel: &'a CancellationToken,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            let mut incentive: ApprenticeshipIncentive =
                load(self.repository.as_ref(), command.apprenticeship_incentive_id).await?;
            let calendar = self.calendar.get().await?;
            let profiles = self.profiles.get().await?;

            let outcome =
                incentive.calculate_earnings_within(&calendar, &profiles, &self.window)?;

            tracing::debug!(
                apprenticeship_incentive_id = %command.apprenticeship_incentive_id,
                is_eligible = outcome.is_eligible,
                created = outcome.pending_payments_created,
                removed = outcome.pending_payments_removed,
                clawbacks = outcome.clawbacks_created,
                "Earnings reconciled"
            );
            IncentiveMetrics::record_clawbacks(outcome.clawbacks_created);

            self.repository.save(&mut incentive).await?;
            Ok(())
        })
    }
}

/// Handles the single-step incentive commands: start date, payment creation,
/// payment sent and pause/resume.
pub struct IncentiveCommandHandler<R> {
    repository: Arc<R>,
}

impl<R> IncentiveCommandHandler<R> {
    /// Creates the handler.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R> Clone for IncentiveCommandHandler<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R> CommandHandler<SetStartDateCommand> for IncentiveCommandHandler<R>
where
    R: DomainRepository<ApprenticeshipIncentive>,
{
    fn handle<'a>(
        &'a self,
        command: &'a SetStartDateCommand,
        _cancel: &'a CancellationToken,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            let mut incentive: ApprenticeshipIncentive =
                load(self.repository.as_ref(), command.apprenticeship_incentive_id).await?;
            incentive.set_start_date(command.start_date);
            self.repository.save(&mut incentive).await?;
            Ok(())
        })
    }
}

impl<R> CommandHandler<CreatePaymentCommand> for IncentiveCommandHandler<R>
where
    R: DomainRepository<ApprenticeshipIncentive>,
{
    fn handle<'a>(
        &'a self,
        command: &'a CreatePaymentCommand,
        _cancel: &'a CancellationToken,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            let mut incentive: ApprenticeshipIncentive =
                load(self.repository.as_ref(), command.apprenticeship_incentive_id).await?;
            let payment_id = incentive.create_payment(
                command.pending_payment_id,
                command.collection_year,
                command.collection_period,
            )?;
            tracing::debug!(
                pending_payment_id = %command.pending_payment_id,
                payment_id = %payment_id,
                "Payment created"
            );
            self.repository.save(&mut incentive).await?;
            Ok(())
        })
    }
}

impl<R> CommandHandler<RecordPaymentSentCommand> for IncentiveCommandHandler<R>
where
    R: DomainRepository<ApprenticeshipIncentive>,
{
    fn handle<'a>(
        &'a self,
        command: &'a RecordPaymentSentCommand,
        _cancel: &'a CancellationToken,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            let mut incentive: ApprenticeshipIncentive =
                load(self.repository.as_ref(), command.apprenticeship_incentive_id).await?;
            incentive.record_payment_sent(command.payment_id, command.paid_date)?;
            self.repository.save(&mut incentive).await?;
            Ok(())
        })
    }
}

impl<R> CommandHandler<PausePaymentsCommand> for IncentiveCommandHandler<R>
where
    R: DomainRepository<ApprenticeshipIncentive>,
{
    fn handle<'a>(
        &'a self,
        command: &'a PausePaymentsCommand,
        _cancel: &'a CancellationToken,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            let mut incentive: ApprenticeshipIncentive =
                load(self.repository.as_ref(), command.apprenticeship_incentive_id).await?;
            match command.action {
                PauseAction::Pause => incentive.pause_payments()?,
                PauseAction::Resume => incentive.resume_payments()?,
            }
            self.repository.save(&mut incentive).await?;
            Ok(())
        })
    }
}
