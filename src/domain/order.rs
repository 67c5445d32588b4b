use super::customer::CustomerId;
use super::money::{Amount, Currency};
use super::payment::ChargeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

/// The order payload carried by a checkout request, before any money moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub amount: Amount,
    pub currency: Currency,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
        }
    }
}

/// Order as handed to the store for insertion. The store assigns id and date.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub draft: OrderDraft,
    pub charge_id: ChargeId,
    pub status: OrderStatus,
}

/// A persisted purchase. Immutable once written.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub amount: Amount,
    pub currency: Currency,
    pub status: OrderStatus,
    pub charge_id: ChargeId,
    pub purchase_date: DateTime<Utc>,
}

impl Order {
    pub fn from_new(id: OrderId, new: NewOrder, purchase_date: DateTime<Utc>) -> Self {
        Self {
            id,
            customer_id: new.draft.customer_id,
            product_id: new.draft.product_id,
            amount: new.draft.amount,
            currency: new.draft.currency,
            status: new.status,
            charge_id: new.charge_id,
            purchase_date,
        }
    }
}
