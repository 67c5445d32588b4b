use super::intent::IdempotencyKey;
use super::money::{Amount, Currency};
use crate::error::CheckoutError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Opaque gateway-issued handle for a chargeable customer (`cus_...`).
///
/// Owned by the gateway; this system only stores and forwards it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PaymentMethodReference(String);

impl PaymentMethodReference {
    pub fn new(reference: impl Into<String>) -> Result<Self, CheckoutError> {
        let reference = reference.into();
        if reference.trim().is_empty() {
            return Err(CheckoutError::Validation(
                "payment method reference must not be empty".to_string(),
            ));
        }
        Ok(Self(reference))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PaymentMethodReference {
    type Error = CheckoutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PaymentMethodReference> for String {
    fn from(reference: PaymentMethodReference) -> Self {
        reference.0
    }
}

impl fmt::Display for PaymentMethodReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Single-use card token produced by the gateway's client-side library.
#[derive(Clone, PartialEq, Eq)]
pub struct CardToken(String);

impl CardToken {
    pub fn new(token: &str) -> Result<Self, CheckoutError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CheckoutError::Validation(
                "card token must not be empty".to_string(),
            ));
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens are single-use credentials; keep them out of logs.
impl fmt::Debug for CardToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "CardToken({prefix}***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChargeId(pub String);

impl fmt::Display for ChargeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the gateway needs for one charge attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeRequest {
    pub amount: Amount,
    pub currency: Currency,
    pub description: String,
    pub customer: PaymentMethodReference,
    /// Forwarded so a gateway that deduplicates on it never bills twice.
    pub idempotency_key: IdempotencyKey,
}

/// Confirmation of a successful charge. Orders can only be built from one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeReceipt {
    pub charge_id: ChargeId,
    pub amount: Amount,
    pub currency: Currency,
}

/// Failure reported by a payment gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Token invalid, expired or already consumed.
    #[error("token rejected: {0}")]
    RejectedToken(String),
    /// The card issuer refused the charge.
    #[error("declined: {0}")]
    Declined(String),
    /// The request provably did not take effect (connection refused, rate limited).
    #[error("unavailable: {0}")]
    Unavailable(String),
    /// The request may or may not have taken effect (timeout, 5xx mid-charge).
    #[error("ambiguous outcome: {0}")]
    Ambiguous(String),
}
