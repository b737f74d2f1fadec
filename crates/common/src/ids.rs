//! Identifier newtypes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a UUID-backed identifier with the usual conversions.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
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

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id! {
    /// Key of an event stream in the event store.
    ///
    /// Every cart and order is one stream. Domain identifiers convert into
    /// it, never the other way round.
    AggregateId
}

uuid_id! {
    /// Authenticated buyer identity, resolved outside the core.
    BuyerId
}

uuid_id! {
    /// Identifier of a committed order.
    OrderId
}

uuid_id! {
    /// Opaque reference to a shipping contact in the external contact book.
    ContactId
}

impl From<OrderId> for AggregateId {
    fn from(id: OrderId) -> Self {
        Self(id.0)
    }
}

/// A buyer's cart stream shares the buyer's UUID, so a buyer can only ever
/// have one open cart.
impl From<BuyerId> for AggregateId {
    fn from(id: BuyerId) -> Self {
        Self(id.0)
    }
}
