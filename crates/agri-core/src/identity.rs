//! # Domain Identity Newtypes
//!
//! Newtype wrappers for the identifiers used by the ledger. These prevent
//! accidental identifier confusion: a `ProductId` cannot be passed where a
//! `BatchId` is expected, even though both are sequential integers.
//!
//! ## Numbering
//!
//! Products, batches and escrow transactions are numbered sequentially
//! starting at 1. The value 0 is never assigned, so a zero id is always a
//! lookup miss and never aliases a real record.

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Opaque unique identity of a participant.
///
/// Construction rejects empty and all-whitespace keys, including on
/// deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    /// Create a principal from its identity key.
    pub fn new(key: impl Into<String>) -> Result<Self, LedgerError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(LedgerError::InvalidInput(
                "principal key must not be empty".to_string(),
            ));
        }
        Ok(Self(key))
    }

    /// Access the identity key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Principal {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Principal> for String {
    fn from(p: Principal) -> Self {
        p.0
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! sequential_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// The first id handed out by a fresh ledger.
            pub const FIRST: Self = Self(1);

            /// Access the raw number.
            pub fn get(&self) -> u64 {
                self.0
            }

            /// Whether this id could ever have been assigned.
            pub fn is_assignable(&self) -> bool {
                self.0 != 0
            }

            /// The id following this one.
            pub fn next(&self) -> Self {
                Self(self.0 + 1)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

sequential_id!(
    /// Sequential identifier of a catalog product.
    ProductId,
    "product"
);

sequential_id!(
    /// Sequential identifier of a tracked batch.
    BatchId,
    "batch"
);

sequential_id!(
    /// Sequential identifier of an escrow transaction.
    TransactionId,
    "tx"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_rejects_empty() {
        assert!(Principal::new("").is_err());
        assert!(Principal::new("   ").is_err());
        assert_eq!(Principal::new("farm-a").unwrap().as_str(), "farm-a");
    }

    #[test]
    fn test_principal_deserialize_validates() {
        let ok: Principal = serde_json::from_str("\"farm-a\"").unwrap();
        assert_eq!(ok.to_string(), "farm-a");
        assert!(serde_json::from_str::<Principal>("\"\"").is_err());
    }

    #[test]
    fn test_sequential_ids() {
        assert_eq!(BatchId::FIRST.get(), 1);
        assert_eq!(BatchId::FIRST.next(), BatchId(2));
        assert!(!BatchId(0).is_assignable());
        assert_eq!(ProductId(7).to_string(), "product:7");
        assert_eq!(TransactionId(3).to_string(), "tx:3");
    }

    #[test]
    fn test_ids_serialize_as_numbers() {
        assert_eq!(serde_json::to_string(&BatchId(42)).unwrap(), "42");
    }
}
