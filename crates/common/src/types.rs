use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates the identifier from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns true if the identifier is empty or whitespace only.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Catalog-assigned product identifier.
    ProductId
);

string_id!(
    /// Customer account identifier (the customer's username).
    CustomerId
);

string_id!(
    /// Seller account identifier (the seller's username).
    SellerId
);

/// Number of a master order, assigned by the ID generator.
///
/// Rendered as a decimal string in JSON so clients that store numbers as
/// doubles do not lose precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderNumber(u64);

impl OrderNumber {
    /// Wraps a raw generator value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for OrderNumber {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Error returned when an order number string is not a valid number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid order number: {0:?}")]
pub struct ParseOrderNumberError(pub String);

impl FromStr for OrderNumber {
    type Err = ParseOrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ParseOrderNumberError(s.to_string()))
    }
}

impl Serialize for OrderNumber {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for OrderNumber {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Identifier of a per-seller sub-order, formatted as `S-<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubOrderNumber(String);

impl SubOrderNumber {
    /// Builds a sub-order number from a generator value.
    pub fn from_id(id: u64) -> Self {
        Self(format!("S-{id}"))
    }

    /// Restores a sub-order number read back from storage.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubOrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a single order line, formatted as `I-<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineNumber(String);

impl LineNumber {
    /// Builds a line number from a generator value.
    pub fn from_id(id: u64) -> Self {
        Self(format!("I-{id}"))
    }

    /// Restores a line number read back from storage.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LineNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_id_string_conversion() {
        let id = ProductId::new("p-001");
        assert_eq!(id.as_str(), "p-001");

        let id2: ProductId = "p-002".into();
        assert_eq!(id2.to_string(), "p-002");
    }

    #[test]
    fn blank_identifiers_are_detected() {
        assert!(CustomerId::new("").is_blank());
        assert!(CustomerId::new("   ").is_blank());
        assert!(!CustomerId::new("alice").is_blank());
    }

    #[test]
    fn order_number_serializes_as_string() {
        let number = OrderNumber::new(7_301_234_567_890_123_456);
        let json = serde_json::to_string(&number).unwrap();
        assert_eq!(json, "\"7301234567890123456\"");
    }

    #[test]
    fn order_number_accepts_string_or_number() {
        let from_text: OrderNumber = serde_json::from_str("\"42\"").unwrap();
        let from_number: OrderNumber = serde_json::from_str("42").unwrap();
        assert_eq!(from_text, OrderNumber::new(42));
        assert_eq!(from_number, OrderNumber::new(42));
    }

    #[test]
    fn order_number_rejects_garbage() {
        let err = "12ab".parse::<OrderNumber>().unwrap_err();
        assert_eq!(err, ParseOrderNumberError("12ab".to_string()));
        assert!("-1".parse::<OrderNumber>().is_err());
    }

    #[test]
    fn sub_order_and_line_numbers_are_prefixed() {
        assert_eq!(SubOrderNumber::from_id(99).as_str(), "S-99");
        assert_eq!(LineNumber::from_id(100).as_str(), "I-100");
    }
}
