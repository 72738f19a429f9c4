//! Domain command handlers.
//!
//! Each handler loads its aggregate, applies one mutation and saves it. Locking,
//! retrying and logging are added by the pipeline around them.

mod account;
mod calendar;
mod incentive;

pub use account::AddLegalEntityHandler;
pub use calendar::ActivateCollectionPeriodHandler;
pub use incentive::{CalculateEarningsHandler, IncentiveCommandHandler};

use employer_incentives_core::services::{Aggregate, DomainRepository};

use crate::error::CommandError;

/// Loads an aggregate or fails with [`CommandError::AggregateNotFound`].
async fn load<A, R>(repository: &R, id: A::Id) -> Result<A, CommandError>
where
    A: Aggregate,
    R: DomainRepository<A>,
{
    repository
        .find(id)
        .await?
        .ok_or_else(|| CommandError::AggregateNotFound {
            kind: A::KIND,
            id: id.to_string(),
        })
}
