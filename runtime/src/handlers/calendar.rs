use employer_incentives_core::services::CollectionCalendarService;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::command::ActivateCollectionPeriodCommand;
use crate::handler::{CommandHandler, HandlerFuture};

/// Sets a collection period's active flag and stores the calendar.
pub struct ActivateCollectionPeriodHandler<S> {
    calendar: Arc<S>,
}

impl<S> ActivateCollectionPeriodHandler<S> {
    /// Creates the handler.
    #[must_use]
    pub const fn new(calendar: Arc<S>) -> Self {
        Self { calendar }
    }
}

impl<S: CollectionCalendarService> CommandHandler<ActivateCollectionPeriodCommand>
    for ActivateCollectionPeriodHandler<S>
{
    fn handle<'a>(
        &'a self,
        command: &'a ActivateCollectionPeriodCommand,
        _cancel: &'a CancellationToken,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            let mut calendar = self.calendar.get().await?;
            calendar.activate_period(command.calendar_year, command.period_number, command.active);
            self.calendar.save(&calendar).await?;
            Ok(())
        })
    }
}
