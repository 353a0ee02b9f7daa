use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a rental order.
///
/// Opaque string identifier. New orders get a UUIDv4, but the type
/// accepts any non-empty string so externally minted ids round-trip
/// through the wire format unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Creates a new random order ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the order ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Unique identifier for a user account (payer or renter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Creates a user ID from a raw integer.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying integer.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Unique identifier for a listed product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(i64);

impl ProductId {
    /// Creates a product ID from a raw integer.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying integer.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ProductId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Error converting an external amount into [`Money`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoneyError(pub String);

impl std::fmt::Display for MoneyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid money amount: {}", self.0)
    }
}

impl std::error::Error for MoneyError {}

/// Money amount represented in minor units (cents) to avoid floating
/// point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a new Money amount from a whole major-unit value.
    pub fn from_major(major: i64) -> Self {
        Self { cents: major * 100 }
    }

    /// Converts a floating-point major-unit amount (as carried by the
    /// wire format) into Money, rounding to the nearest cent.
    pub fn try_from_major_f64(amount: f64) -> Result<Self, MoneyError> {
        if !amount.is_finite() {
            return Err(MoneyError(format!("{amount} is not finite")));
        }
        let cents = (amount * 100.0).round();
        if cents.abs() > i64::MAX as f64 {
            return Err(MoneyError(format!("{amount} out of range")));
        }
        Ok(Self {
            cents: cents as i64,
        })
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the amount as a floating-point major-unit value.
    pub fn as_major_f64(&self) -> f64 {
        self.cents as f64 / 100.0
    }

    /// Returns the major-unit portion (whole number).
    pub fn major(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after major units).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Adds another money amount.
    pub fn add(&self, other: Money) -> Money {
        Money {
            cents: self.cents + other.cents,
        }
    }

    /// Divides the amount evenly across a number of days, rounding to
    /// the nearest cent. Used for the daily payment rate.
    pub fn per_day(&self, days: i64) -> Money {
        Money {
            cents: ((self.cents as f64) / (days as f64)).round() as i64,
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", -self.major(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.major(), self.cents_part())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_new_creates_unique_ids() {
        let id1 = OrderId::new();
        let id2 = OrderId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn order_id_preserves_external_value() {
        let id = OrderId::from("o1");
        assert_eq!(id.as_str(), "o1");
        assert_eq!(id.to_string(), "o1");
    }

    #[test]
    fn order_id_serialization_roundtrip() {
        let id = OrderId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn user_id_serializes_as_integer() {
        let id = UserId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
    }

    #[test]
    fn money_from_major_f64_rounds_to_cents() {
        let m = Money::try_from_major_f64(120.0).unwrap();
        assert_eq!(m.cents(), 12000);
        let m = Money::try_from_major_f64(19.999).unwrap();
        assert_eq!(m.cents(), 2000);
    }

    #[test]
    fn money_rejects_non_finite() {
        assert!(Money::try_from_major_f64(f64::NAN).is_err());
        assert!(Money::try_from_major_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn money_as_major_f64_roundtrip() {
        let m = Money::from_cents(12345);
        assert!((m.as_major_f64() - 123.45).abs() < f64::EPSILON);
    }

    #[test]
    fn money_per_day_rounds() {
        let m = Money::from_cents(10000);
        assert_eq!(m.per_day(3).cents(), 3333);
    }

    #[test]
    fn money_display() {
        assert_eq!(Money::from_cents(12000).to_string(), "$120.00");
        assert_eq!(Money::from_cents(-150).to_string(), "-$1.50");
    }
}
