use super::payment::PaymentMethodReference;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub u64);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A customer as held by the store of record.
///
/// Only `payment_reference` is touched by checkout, and only after a new card
/// was accepted with `remember` set.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Customer {
    pub id: CustomerId,
    pub email: Option<String>,
    /// Credential hash as stored by sign-up. Never produced or checked here.
    pub password_hash: Option<String>,
    pub payment_reference: Option<PaymentMethodReference>,
}

impl Customer {
    pub fn new(id: CustomerId) -> Self {
        Self {
            id,
            email: None,
            password_hash: None,
            payment_reference: None,
        }
    }

    /// Vaults a gateway reference, replacing any earlier one.
    pub fn remember(&mut self, reference: PaymentMethodReference) {
        self.payment_reference = Some(reference);
    }
}
