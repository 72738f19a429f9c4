//! # Employer Incentives Runtime
//!
//! Command pipeline for the employer incentives domain.
//!
//! Every command reaches its domain handler through a chain of decorators:
//!
//! - **Logging**: start/end/error lines per command, plus pipeline metrics
//! - **Retry**: exponential backoff, only for errors that can clear on their own
//! - **Distributed lock**: serializes commands that touch the same aggregate
//!
//! ## Core Components
//!
//! - [`command`]: the commands and their lock ids
//! - [`handlers`]: load an aggregate, mutate it, save it
//! - [`pipeline`]: assembles decorators around handlers
//! - [`config`]: environment-based configuration and the payment profile table
//! - [`dispatch`]: routes domain events to topics
//!
//! ## Example
//!
//! ```ignore
//! use employer_incentives_runtime::{PipelineBuilder, RetryPolicy, CalculateEarningsHandler};
//!
//! let builder = PipelineBuilder::standard(RetryPolicy::default(), lock_provider);
//! let calculate = builder.build(CalculateEarningsHandler::new(repo, calendar, profiles));
//!
//! let command = CalculateEarningsCommand {
//!     apprenticeship_incentive_id: id,
//!     account_id: 1,
//!     apprenticeship_id: 2,
//! };
//! calculate.handle(&command, &cancel).await?;
//! ```

pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod lock;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod retry;

pub use command::{
    ActivateCollectionPeriodCommand, AddLegalEntityCommand, CalculateEarningsCommand, Command,
    CreatePaymentCommand, PauseAction, PausePaymentsCommand, RecordPaymentSentCommand,
    SetStartDateCommand,
};
pub use config::{ConfigError, ConfiguredPaymentProfiles, Environment, IncentivesConfig};
pub use dispatch::{EventRouter, TracingDispatcher};
pub use error::CommandError;
pub use handler::{CommandHandler, HandlerFuture};
pub use handlers::{
    ActivateCollectionPeriodHandler, AddLegalEntityHandler, CalculateEarningsHandler,
    IncentiveCommandHandler,
};
pub use lock::WithDistributedLock;
pub use logging::WithLogging;
pub use pipeline::{Layer, Pipeline, PipelineBuilder};
pub use retry::{RetryPolicy, WithRetry};
