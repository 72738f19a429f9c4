//! Domain events raised by the incentive and account aggregates.
//!
//! Aggregates accumulate events while a command mutates them; the repository
//! flushes and dispatches them after the aggregate has been persisted. Events are
//! a closed enum so dispatchers match on them exhaustively.
//!
//! # Serialization
//!
//! Events serialize with `bincode` into a [`SerializedEvent`] whose `event_type`
//! carries a version suffix (`"EarningsCalculated.v1"`) so consumers can route and
//! evolve schemas independently.
//!
//! # Example
//!
//! ```
//! use employer_incentives_core::event::{DomainEvent, Event, SerializedEvent};
//! use employer_incentives_core::ids::{ApplicationApprenticeshipId, ApprenticeshipIncentiveId};
//!
//! let event = DomainEvent::EarningsCalculated {
//!     apprenticeship_incentive_id: ApprenticeshipIncentiveId::new(),
//!     account_id: 7,
//!     apprenticeship_id: 42,
//!     application_apprenticeship_id: ApplicationApprenticeshipId::new(),
//! };
//!
//! let serialized = SerializedEvent::from_event(&event, None).unwrap();
//! assert_eq!(serialized.event_type, "EarningsCalculated.v1");
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

use crate::ids::{
    ApplicationApprenticeshipId, ApprenticeshipIncentiveId, PaymentId, PendingPaymentId,
};

/// Error types for event operations.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),
}

/// An event that can be serialized and routed by type.
///
/// `event_type()` returns a stable identifier including a version number, e.g.
/// `"StartDateChanged.v1"`.
pub trait Event: Send + Sync + 'static {
    /// Returns the versioned event type identifier.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the bytes do not decode into
    /// this event type.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// Every business event the domain raises.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A new incentive was created for an apprenticeship.
    ApprenticeshipIncentiveCreated {
        /// The new incentive
        apprenticeship_incentive_id: ApprenticeshipIncentiveId,
        /// Employer account
        account_id: i64,
        /// Apprenticeship the incentive is for
        apprenticeship_id: i64,
        /// Application-side apprenticeship record
        application_apprenticeship_id: ApplicationApprenticeshipId,
    },

    /// Earnings were (re)calculated. Raised on every calculation, even when
    /// nothing changed.
    EarningsCalculated {
        /// The recalculated incentive
        apprenticeship_incentive_id: ApprenticeshipIncentiveId,
        /// Employer account
        account_id: i64,
        /// Apprenticeship the incentive is for
        apprenticeship_id: i64,
        /// Application-side apprenticeship record
        application_apprenticeship_id: ApplicationApprenticeshipId,
    },

    /// The apprenticeship start date changed; earnings need recalculating.
    StartDateChanged {
        /// The affected incentive
        apprenticeship_incentive_id: ApprenticeshipIncentiveId,
        /// Start date before the change
        previous_start_date: NaiveDate,
        /// Start date after the change
        new_start_date: NaiveDate,
    },

    /// Payments for the incentive were paused.
    PaymentsPaused {
        /// The affected incentive
        apprenticeship_incentive_id: ApprenticeshipIncentiveId,
    },

    /// Payments for the incentive were resumed.
    PaymentsResumed {
        /// The affected incentive
        apprenticeship_incentive_id: ApprenticeshipIncentiveId,
    },

    /// A payment was raised against a pending payment.
    PaymentCreated {
        /// The affected incentive
        apprenticeship_incentive_id: ApprenticeshipIncentiveId,
        /// Pending payment the payment settles
        pending_payment_id: PendingPaymentId,
        /// The new payment
        payment_id: PaymentId,
    },

    /// A payment was recorded as sent.
    PaymentSent {
        /// The affected incentive
        apprenticeship_incentive_id: ApprenticeshipIncentiveId,
        /// The sent payment
        payment_id: PaymentId,
        /// Date the money left
        paid_date: NaiveDate,
    },

    /// A legal entity was added to an employer account.
    LegalEntityAdded {
        /// Employer account
        account_id: i64,
        /// Account-scoped legal entity id
        account_legal_entity_id: i64,
        /// Legal entity id
        legal_entity_id: i64,
        /// Legal entity name
        name: String,
    },

    /// A legal entity was removed from an employer account.
    LegalEntityRemoved {
        /// Employer account
        account_id: i64,
        /// Account-scoped legal entity id
        account_legal_entity_id: i64,
    },
}

impl Event for DomainEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::ApprenticeshipIncentiveCreated { .. } => "ApprenticeshipIncentiveCreated.v1",
            Self::EarningsCalculated { .. } => "EarningsCalculated.v1",
            Self::StartDateChanged { .. } => "StartDateChanged.v1",
            Self::PaymentsPaused { .. } => "PaymentsPaused.v1",
            Self::PaymentsResumed { .. } => "PaymentsResumed.v1",
            Self::PaymentCreated { .. } => "PaymentCreated.v1",
            Self::PaymentSent { .. } => "PaymentSent.v1",
            Self::LegalEntityAdded { .. } => "LegalEntityAdded.v1",
            Self::LegalEntityRemoved { .. } => "LegalEntityRemoved.v1",
        }
    }
}

/// A serialized event ready for a transport.
#[derive(Clone, Debug)]
pub struct SerializedEvent {
    /// The event type identifier (e.g., "EarningsCalculated.v1").
    pub event_type: String,

    /// The bincode-serialized event data.
    pub data: Vec<u8>,

    /// Optional metadata (correlation id, originating command, ...).
    pub metadata: Option<serde_json::Value>,
}

impl SerializedEvent {
    /// Create a new serialized event.
    #[must_use]
    pub const fn new(
        event_type: String,
        data: Vec<u8>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_type,
            data,
            metadata,
        }
    }

    /// Serialize an [`Event`].
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    pub fn from_event<E: Event + Serialize>(
        event: &E,
        metadata: Option<serde_json::Value>,
    ) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
            metadata,
        })
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.data.len()
        )
    }
}
