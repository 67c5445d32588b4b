use super::customer::CustomerId;
use super::order::{OrderDraft, OrderId};
use super::payment::{ChargeId, ChargeReceipt};
use crate::error::CheckoutError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Longest key the gateway accepts in its `Idempotency-Key` header.
const GATEWAY_KEY_LEN: usize = 255;
/// Leaves room for the `:<attempt>` suffix of [`ChargeIntent::gateway_key`].
const MAX_KEY_LEN: usize = GATEWAY_KEY_LEN - 11;

/// Client-chosen (or generated) key identifying one logical checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(key: &str) -> Result<Self, CheckoutError> {
        let key = key.trim();
        if key.is_empty() || key.len() > MAX_KEY_LEN {
            return Err(CheckoutError::Validation(format!(
                "idempotency key must be 1..={MAX_KEY_LEN} characters"
            )));
        }
        Ok(Self(key.to_string()))
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = CheckoutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<IdempotencyKey> for String {
    fn from(key: IdempotencyKey) -> Self {
        key.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    /// Written before the gateway is called.
    Pending,
    /// The gateway confirmed the charge; the order is not yet recorded.
    Charged,
    /// Charge confirmed and order persisted. Final.
    Recorded,
    /// No money moved. A new attempt may reuse the key.
    Failed,
    /// The gateway call ended ambiguously. Needs an operator.
    Unknown,
}

/// Durable record of "we are about to charge / have charged" for one key.
///
/// Mutated through its transition methods and written back through the
/// `ChargeIntentStore` port.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ChargeIntent {
    pub key: IdempotencyKey,
    pub order: OrderDraft,
    pub status: IntentStatus,
    pub charge_id: Option<ChargeId>,
    pub order_id: Option<OrderId>,
    pub failure: Option<String>,
    /// Starts at 1 and grows each time a `Failed` intent is reclaimed.
    #[serde(default = "first_attempt")]
    pub attempt: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChargeIntent {
    pub fn pending(key: IdempotencyKey, order: OrderDraft) -> Self {
        let now = Utc::now();
        Self {
            key,
            order,
            status: IntentStatus::Pending,
            charge_id: None,
            order_id: None,
            failure: None,
            attempt: first_attempt(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Takes over a key whose previous attempt failed without charging.
    pub fn retrying(mut self, failed: &ChargeIntent) -> Self {
        self.attempt = failed.attempt.saturating_add(1);
        self
    }

    /// Key sent to the gateway for this attempt.
    ///
    /// Gateways cache the first response per key, so each attempt gets its
    /// own; retries within one attempt still deduplicate.
    pub fn gateway_key(&self) -> IdempotencyKey {
        IdempotencyKey(format!("{}:{}", self.key, self.attempt))
    }

    pub fn customer_id(&self) -> CustomerId {
        self.order.customer_id
    }

    /// True when `order` is the same purchase this intent was opened for.
    pub fn matches(&self, order: &OrderDraft) -> bool {
        self.order == *order
    }

    pub fn mark_charged(&mut self, charge_id: ChargeId) {
        self.status = IntentStatus::Charged;
        self.charge_id = Some(charge_id);
        self.failure = None;
        self.touch();
    }

    pub fn mark_recorded(&mut self, order_id: OrderId) {
        self.status = IntentStatus::Recorded;
        self.order_id = Some(order_id);
        self.failure = None;
        self.touch();
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.status = IntentStatus::Failed;
        self.failure = Some(reason.into());
        self.touch();
    }

    pub fn mark_unknown(&mut self, reason: impl Into<String>) {
        self.status = IntentStatus::Unknown;
        self.failure = Some(reason.into());
        self.touch();
    }

    /// Notes a failed recording attempt without leaving the `Charged` state.
    pub fn note_record_failure(&mut self, reason: impl Into<String>) {
        self.failure = Some(reason.into());
        self.touch();
    }

    /// Rebuilds the charge confirmation once the gateway has accepted the charge.
    pub fn receipt(&self) -> Option<ChargeReceipt> {
        self.charge_id.as_ref().map(|charge_id| ChargeReceipt {
            charge_id: charge_id.clone(),
            amount: self.order.amount,
            currency: self.order.currency.clone(),
        })
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn first_attempt() -> u32 {
    1
}

/// Outcome of claiming an idempotency key in a `ChargeIntentStore`.
#[derive(Debug, PartialEq, Clone)]
pub enum Claim {
    /// The key was free or its last attempt failed; this intent now owns it.
    Started(ChargeIntent),
    /// An earlier attempt holds the key. Nothing was written.
    Existing(ChargeIntent),
}

impl Claim {
    /// Decides a claim of `fresh.key` against whatever the store holds for it.
    pub fn decide(stored: Option<ChargeIntent>, fresh: ChargeIntent) -> Self {
        match stored {
            None => Claim::Started(fresh),
            Some(failed) if failed.status == IntentStatus::Failed => {
                Claim::Started(fresh.retrying(&failed))
            }
            Some(existing) => Claim::Existing(existing),
        }
    }
}
