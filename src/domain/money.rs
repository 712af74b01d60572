use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Money is represented as integer cents to avoid floating-point precision issues.
/// For EUR/USD, 1 unit = 100 cents, so €50.00 = 5000 cents.
pub type Cents = i64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("invalid money amount: {0:?}")]
    InvalidAmount(String),

    #[error("invalid currency code: {0:?} (expected 3 uppercase letters)")]
    InvalidCurrency(String),

    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: Currency, right: Currency },

    #[error("money amount overflow")]
    Overflow,
}

/// ISO-4217-style currency code: exactly 3 uppercase ASCII letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Currency([u8; 3]);

impl Currency {
    pub fn new(code: &str) -> Result<Self, MoneyError> {
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_uppercase()) {
            return Err(MoneyError::InvalidCurrency(code.to_string()));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2]]))
    }

    pub fn as_str(&self) -> &str {
        // Invariant: bytes are ASCII uppercase, checked in new()
        std::str::from_utf8(&self.0).expect("currency code is ASCII")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for Currency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Currency::new(&code).map_err(serde::de::Error::custom)
    }
}

/// A fixed-scale (2 decimals) monetary amount tagged with its currency.
/// Immutable: every operation returns a new value. Amounts in different
/// currencies never add, subtract, or compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoneyValue {
    cents: Cents,
    currency: Currency,
}

impl MoneyValue {
    /// Parse a decimal string into a money value, normalizing to 2 decimals
    /// with round-half-up (away from zero).
    /// Example: "50.00" -> 5000 cents, "10.125" -> 1013, "-0.01" -> -1
    pub fn new(amount: &str, currency: Currency) -> Result<Self, MoneyError> {
        let cents = parse_cents(amount)?;
        Ok(Self { cents, currency })
    }

    /// Exact constructor from integer cents, no rounding involved.
    pub const fn from_cents(cents: Cents, currency: Currency) -> Self {
        Self { cents, currency }
    }

    /// The zero amount in the given currency.
    pub const fn zero(currency: Currency) -> Self {
        Self { cents: 0, currency }
    }

    pub const fn cents(&self) -> Cents {
        self.cents
    }

    pub const fn currency(&self) -> Currency {
        self.currency
    }

    pub fn add(&self, other: &MoneyValue) -> Result<MoneyValue, MoneyError> {
        self.require_same_currency(other)?;
        let cents = self
            .cents
            .checked_add(other.cents)
            .ok_or(MoneyError::Overflow)?;
        Ok(Self { cents, currency: self.currency })
    }

    pub fn subtract(&self, other: &MoneyValue) -> Result<MoneyValue, MoneyError> {
        self.require_same_currency(other)?;
        let cents = self
            .cents
            .checked_sub(other.cents)
            .ok_or(MoneyError::Overflow)?;
        Ok(Self { cents, currency: self.currency })
    }

    /// Scalar multiply, rounded half-up (away from zero) to 2 decimals.
    pub fn multiply(&self, factor: f64) -> Result<MoneyValue, MoneyError> {
        if !factor.is_finite() {
            return Err(MoneyError::InvalidAmount(factor.to_string()));
        }
        let scaled = self.cents as f64 * factor;
        if !scaled.is_finite() || scaled.abs() >= i64::MAX as f64 {
            return Err(MoneyError::Overflow);
        }
        let rounded = if scaled >= 0.0 {
            (scaled + 0.5).floor()
        } else {
            (scaled - 0.5).ceil()
        };
        Ok(Self {
            cents: rounded as Cents,
            currency: self.currency,
        })
    }

    /// Compare two amounts of the same currency.
    pub fn try_cmp(&self, other: &MoneyValue) -> Result<Ordering, MoneyError> {
        self.require_same_currency(other)?;
        Ok(self.cents.cmp(&other.cents))
    }

    pub const fn is_positive(&self) -> bool {
        self.cents > 0
    }

    pub const fn is_negative(&self) -> bool {
        self.cents < 0
    }

    pub const fn is_zero(&self) -> bool {
        self.cents == 0
    }

    fn require_same_currency(&self, other: &MoneyValue) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            });
        }
        Ok(())
    }
}

impl fmt::Display for MoneyValue {
    /// Example: 5000 cents EUR -> "50.00 EUR", -1234 cents -> "-12.34 EUR"
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs_cents = self.cents.unsigned_abs();
        let units = abs_cents / 100;
        let remainder = abs_cents % 100;
        write!(f, "{}{}.{:02} {}", sign, units, remainder, self.currency)
    }
}

/// Parse a signed decimal string into cents, rounding half-up at 2 decimals.
fn parse_cents(input: &str) -> Result<Cents, MoneyError> {
    let invalid = || MoneyError::InvalidAmount(input.to_string());

    let trimmed = input.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let (units_str, frac_str) = match digits.split_once('.') {
        Some((units, frac)) => (units, frac),
        None => (digits, ""),
    };

    if units_str.is_empty() && frac_str.is_empty() {
        return Err(invalid());
    }
    if !units_str.bytes().all(|b| b.is_ascii_digit())
        || !frac_str.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }

    let mut units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| MoneyError::Overflow)?
    };

    let frac_bytes = frac_str.as_bytes();
    let digit = |i: usize| frac_bytes.get(i).map_or(0, |b| i64::from(b - b'0'));
    let mut frac = digit(0) * 10 + digit(1);
    // Round half-up on the third decimal; carries into the units on .995
    if digit(2) >= 5 {
        frac += 1;
        if frac == 100 {
            frac = 0;
            units = units.checked_add(1).ok_or(MoneyError::Overflow)?;
        }
    }

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(frac))
        .ok_or(MoneyError::Overflow)?;

    Ok(if negative { -cents } else { cents })
}
