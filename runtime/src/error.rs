//! Errors surfaced by the command pipeline.

use employer_incentives_core::{DomainError, ServiceError};
use thiserror::Error;

/// Errors returned from [`CommandHandler::handle`](crate::handler::CommandHandler::handle).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The aggregate rejected the mutation.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Another process holds the command's lock.
    #[error("{command} could not acquire lock {lock_id}")]
    EntityLocked {
        /// Command type
        command: &'static str,
        /// Lock that was contended
        lock_id: String,
    },

    /// The cancellation token fired while waiting for a lock or a retry.
    #[error("Command cancelled")]
    Cancelled,

    /// The command targets an aggregate that does not exist.
    #[error("{kind} {id} not found")]
    AggregateNotFound {
        /// Aggregate kind
        kind: &'static str,
        /// Aggregate id
        id: String,
    },

    /// The lock store failed.
    #[error("Lock provider error: {0}")]
    LockProvider(String),

    /// Loading or saving failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Events were persisted but could not be dispatched.
    #[error("Dispatch error: {0}")]
    Dispatch(String),
}

impl CommandError {
    /// Whether the retry decorator should try the command again.
    ///
    /// Only lock contention is retried; everything else is fatal to the command.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::EntityLocked { .. })
    }

    /// Short label for the `outcome` metric dimension.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Domain(_) => "domain_error",
            Self::EntityLocked { .. } => "locked",
            Self::Cancelled => "cancelled",
            Self::AggregateNotFound { .. } => "not_found",
            Self::LockProvider(_) => "lock_provider_error",
            Self::Persistence(_) => "persistence_error",
            Self::Dispatch(_) => "dispatch_error",
        }
    }
}

impl From<ServiceError> for CommandError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Lock(msg) => Self::LockProvider(msg),
            ServiceError::Persistence(msg) => Self::Persistence(msg),
            ServiceError::Dispatch(msg) => Self::Dispatch(msg),
        }
    }
}
