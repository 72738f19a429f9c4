//! Typed identifiers.
//!
//! Entities compare by these ids rather than by structural equality, so each
//! entity kind gets its own newtype and ids of different kinds cannot be mixed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Creates a `", stringify!($name), "` from a UUID")]
            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Returns the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Identifier of an apprenticeship incentive aggregate
    ApprenticeshipIncentiveId
);
uuid_id!(
    /// Identifier of a pending (owed, not yet disbursed) payment
    PendingPaymentId
);
uuid_id!(
    /// Identifier of a payment raised against a pending payment
    PaymentId
);
uuid_id!(
    /// Identifier of a clawback (reversal) record
    ClawbackPaymentId
);
uuid_id!(
    /// Identifier of the application-side apprenticeship record
    ApplicationApprenticeshipId
);

/// The employer account a payment is made to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountRef {
    /// Employer account id
    pub id: i64,
    /// Legal entity within the account that receives the money
    pub account_legal_entity_id: i64,
}

impl AccountRef {
    /// Creates an account reference
    #[must_use]
    pub const fn new(id: i64, account_legal_entity_id: i64) -> Self {
        Self {
            id,
            account_legal_entity_id,
        }
    }
}
