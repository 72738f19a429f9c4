//! Pipeline composition.
//!
//! A [`PipelineBuilder`] records decorator layers outermost first and wraps a
//! domain handler in them when [`PipelineBuilder::build`] is called. The
//! standard order is logging, then retry, then lock:
//!
//! ```text
//! WithLogging -> WithRetry -> WithDistributedLock -> handler
//! ```
//!
//! Logging sees each command once; retry re-enters the lock layer, so every
//! attempt acquires the lock afresh.
//!
//! # Example
//!
//! ```rust,ignore
//! let builder = PipelineBuilder::standard(RetryPolicy::default(), lock_provider);
//! let calculate = builder.build(calculate_earnings_handler);
//!
//! assert_eq!(calculate.layers(), &[Layer::Logging, Layer::Retry, Layer::Lock]);
//! calculate.handle(&command, &CancellationToken::new()).await?;
//! ```

use employer_incentives_core::services::DistributedLockProvider;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::command::Command;
use crate::error::CommandError;
use crate::handler::CommandHandler;
use crate::lock::WithDistributedLock;
use crate::logging::WithLogging;
use crate::retry::{RetryPolicy, WithRetry};

/// The kind of a pipeline layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layer {
    /// [`WithLogging`]
    Logging,
    /// [`WithRetry`]
    Retry,
    /// [`WithDistributedLock`]
    Lock,
}

#[derive(Clone)]
enum LayerSpec {
    Logging,
    Retry(RetryPolicy),
    Lock(Arc<dyn DistributedLockProvider>),
}

impl LayerSpec {
    const fn kind(&self) -> Layer {
        match self {
            Self::Logging => Layer::Logging,
            Self::Retry(_) => Layer::Retry,
            Self::Lock(_) => Layer::Lock,
        }
    }
}

/// Ordered list of decorators to wrap around domain handlers.
///
/// One builder can build pipelines for any number of command types.
#[derive(Clone, Default)]
pub struct PipelineBuilder {
    layers: Vec<LayerSpec>,
}

impl PipelineBuilder {
    /// Creates a builder with no layers.
    #[must_use]
    pub const fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Logging, then retry with `policy`, then locking through `provider`.
    #[must_use]
    pub fn standard(policy: RetryPolicy, provider: Arc<dyn DistributedLockProvider>) -> Self {
        Self::new()
            .with_logging()
            .with_retry(policy)
            .with_lock(provider)
    }

    /// Adds a logging layer inside the layers added so far.
    #[must_use]
    pub fn with_logging(mut self) -> Self {
        self.layers.push(LayerSpec::Logging);
        self
    }

    /// Adds a retry layer inside the layers added so far.
    #[must_use]
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.layers.push(LayerSpec::Retry(policy));
        self
    }

    /// Adds a lock layer inside the layers added so far.
    #[must_use]
    pub fn with_lock(mut self, provider: Arc<dyn DistributedLockProvider>) -> Self {
        self.layers.push(LayerSpec::Lock(provider));
        self
    }

    /// Layer kinds, outermost first.
    #[must_use]
    pub fn layers(&self) -> Vec<Layer> {
        self.layers.iter().map(LayerSpec::kind).collect()
    }

    /// Wraps `handler` in every layer.
    #[must_use]
    pub fn build<C, H>(&self, handler: H) -> Pipeline<C>
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let mut chain: Box<dyn CommandHandler<C>> = Box::new(handler);

        for layer in self.layers.iter().rev() {
            chain = match layer {
                LayerSpec::Logging => Box::new(WithLogging::new(chain)),
                LayerSpec::Retry(policy) => Box::new(WithRetry::new(chain, policy.clone())),
                LayerSpec::Lock(provider) => {
                    Box::new(WithDistributedLock::new(chain, Arc::clone(provider)))
                }
            };
        }

        Pipeline {
            handler: chain,
            layers: self.layers(),
        }
    }
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("layers", &self.layers())
            .finish()
    }
}

/// A domain handler wrapped in its decorators.
pub struct Pipeline<C: Command> {
    handler: Box<dyn CommandHandler<C>>,
    layers: Vec<Layer>,
}

impl<C: Command> Pipeline<C> {
    /// Sends the command through every layer.
    ///
    /// # Errors
    ///
    /// Returns whatever error reaches the outermost layer.
    pub async fn handle(&self, command: &C, cancel: &CancellationToken) -> Result<(), CommandError> {
        self.handler.handle(command, cancel).await
    }

    /// Layer kinds, outermost first.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
}

impl<C: Command> fmt::Debug for Pipeline<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("layers", &self.layers)
            .finish_non_exhaustive()
    }
}
