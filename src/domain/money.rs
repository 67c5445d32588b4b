use crate::error::CheckoutError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A positive charge amount in minor currency units (cents for `usd`).
///
/// Non-positive values cannot be constructed, so anything holding an `Amount`
/// is safe to send to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

impl Amount {
    pub fn new(minor_units: i64) -> Result<Self, CheckoutError> {
        if minor_units > 0 {
            Ok(Self(minor_units))
        } else {
            Err(CheckoutError::InvalidAmount(minor_units))
        }
    }

    /// Accepts a price already in minor units that arrived as a JSON number
    /// (`1999`, `1999.0`). Fractions of a minor unit are rejected, not rounded.
    pub fn from_minor_decimal(price: Decimal) -> Result<Self, CheckoutError> {
        if !price.fract().is_zero() {
            return Err(CheckoutError::Validation(format!(
                "price {price} is not a whole number of minor units"
            )));
        }
        let minor = price
            .to_i64()
            .ok_or_else(|| CheckoutError::Validation(format!("price {price} is out of range")))?;
        Self::new(minor)
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Amount {
    type Error = CheckoutError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lowercase three-letter ISO 4217 currency code, as the gateway expects it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self, CheckoutError> {
        let code = code.trim().to_ascii_lowercase();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_lowercase()) {
            Ok(Self(code))
        } else {
            Err(CheckoutError::Validation(format!(
                "invalid currency code {code:?}"
            )))
        }
    }

    pub fn usd() -> Self {
        Self("usd".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl Default for Currency {
    fn default() -> Self {
        Self::usd()
    }
}

impl TryFrom<String> for Currency {
    type Error = CheckoutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
