use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Internal key of an order row.
///
/// Wraps a UUID to provide type safety and prevent mixing up
/// order keys with other UUID-based identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderKey(Uuid);

impl OrderKey {
    /// Creates a new random order key.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an order key from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OrderKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for OrderKey {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<OrderKey> for Uuid {
    fn from(key: OrderKey) -> Self {
        key.0
    }
}

/// Internal key of a product row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductKey(Uuid);

impl ProductKey {
    /// Creates a new random product key.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a product key from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ProductKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProductKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ProductKey {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<ProductKey> for Uuid {
    fn from(key: ProductKey) -> Self {
        key.0
    }
}

/// Public-facing order identifier shown to customers and admins.
///
/// Format: `[MONTH]_[VENDOR_INITIAL][SEQ]`, e.g. `OCT_A01`. Guest orders
/// without a vendor fall back to a timestamp-based `G` identifier. The
/// identifier is unique in the order store; on an insert collision the
/// caller regenerates and retries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicOrderId(String);

const MONTH_ABBREVS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

impl PublicOrderId {
    /// Wraps an existing identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates an identifier from a vendor code initial and a sequence number.
    pub fn generate(now: DateTime<Utc>, vendor_initial: char, sequence: u32) -> Self {
        let month = MONTH_ABBREVS[now.month0() as usize];
        Self(format!(
            "{}_{}{:02}",
            month,
            vendor_initial.to_ascii_uppercase(),
            sequence
        ))
    }

    /// Generates a timestamp-based guest identifier.
    ///
    /// Also used as the collision fallback when sequence generation fails.
    pub fn guest(now: DateTime<Utc>) -> Self {
        Self(format!("G{}", now.timestamp_millis()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PublicOrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PublicOrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PublicOrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for PublicOrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
