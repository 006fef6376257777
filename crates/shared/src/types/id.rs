//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `UserId` where an `InvoiceId` is expected.
//! All identifiers are database surrogate keys (`BIGSERIAL`).

use serde::{Deserialize, Serialize};

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Wraps a raw key.
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the inner key.
            #[must_use]
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    };
}

typed_id!(UserId, "Unique identifier for a user (issuer or recipient).");
typed_id!(InvoiceId, "Unique identifier for an invoice.");
typed_id!(LineItemId, "Unique identifier for an invoice line item.");
typed_id!(PaymentId, "Unique identifier for a payment.");
typed_id!(ItemId, "Unique identifier for a catalog item.");

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_typed_id_round_trips_through_string() {
        let id = InvoiceId::from_str("42").unwrap();
        assert_eq!(id, InvoiceId(42));
        assert_eq!(id.to_string(), "42");
        assert!(UserId::from_str("abc").is_err());
    }

    #[test]
    fn test_typed_id_serializes_transparently() {
        let json = serde_json::to_string(&PaymentId(9)).unwrap();
        assert_eq!(json, "9");
        let back: PaymentId = serde_json::from_str("9").unwrap();
        assert_eq!(back.into_inner(), 9);
    }
}
