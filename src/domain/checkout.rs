use super::customer::CustomerId;
use super::intent::IdempotencyKey;
use super::order::{Order, OrderDraft};
use super::payment::{CardToken, ChargeReceipt};
use crate::error::CheckoutError;

/// Where the money for a checkout comes from. Exactly one per request.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentSource {
    /// Charge the reference already vaulted for the customer.
    Existing,
    /// Mint a gateway reference from a fresh token, optionally vaulting it.
    NewToken { token: CardToken, remember: bool },
}

/// A validated checkout request. Built by the wire layer; never ambiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub order: OrderDraft,
    pub source: PaymentSource,
    pub idempotency_key: Option<IdempotencyKey>,
}

impl CheckoutRequest {
    pub fn customer_id(&self) -> CustomerId {
        self.order.customer_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutState {
    Start,
    ResolvingMethod,
    Charging,
    RecordingOrder,
    Completed,
    Failed,
    ChargedButUnrecorded,
}

impl CheckoutState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::ChargedButUnrecorded
        )
    }

    /// Legal edges of the checkout workflow.
    ///
    /// `Start -> RecordingOrder` and `Start -> Completed` are the resume edges
    /// taken when an idempotency key is already `Charged` or `Recorded`.
    /// Once charging has succeeded the workflow can no longer end in `Failed`.
    pub fn can_transition_to(self, next: Self) -> bool {
        use CheckoutState::*;
        matches!(
            (self, next),
            (Start, ResolvingMethod)
                | (Start, RecordingOrder)
                | (Start, Completed)
                | (ResolvingMethod, Charging)
                | (Charging, RecordingOrder)
                | (RecordingOrder, Completed)
                | (RecordingOrder, ChargedButUnrecorded)
                | (Start | ResolvingMethod | Charging, Failed)
        )
    }
}

/// Terminal result of one checkout.
#[derive(Debug)]
pub enum CheckoutOutcome {
    Completed {
        order: Order,
        /// The order was recorded by an earlier attempt under the same key.
        replayed: bool,
    },
    /// No money moved (or, for `ChargeOutcomeUnknown`, it is not known to have).
    Failed {
        at: CheckoutState,
        error: CheckoutError,
    },
    /// Money moved but the order is not persisted. Reconciliation owns it now.
    ChargedButUnrecorded {
        receipt: ChargeReceipt,
        error: CheckoutError,
    },
}

/// Everything the caller learns about a finished checkout.
#[derive(Debug)]
pub struct CheckoutReport {
    pub key: IdempotencyKey,
    pub outcome: CheckoutOutcome,
    /// States visited, in order, ending in the terminal state.
    pub trail: Vec<CheckoutState>,
    /// Non-fatal problems, e.g. a remembered card that could not be vaulted.
    pub warnings: Vec<String>,
}

impl CheckoutReport {
    pub fn final_state(&self) -> CheckoutState {
        match self.outcome {
            CheckoutOutcome::Completed { .. } => CheckoutState::Completed,
            CheckoutOutcome::Failed { .. } => CheckoutState::Failed,
            CheckoutOutcome::ChargedButUnrecorded { .. } => CheckoutState::ChargedButUnrecorded,
        }
    }

    pub fn order(&self) -> Option<&Order> {
        match &self.outcome {
            CheckoutOutcome::Completed { order, .. } => Some(order),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&CheckoutError> {
        match &self.outcome {
            CheckoutOutcome::Completed { .. } => None,
            CheckoutOutcome::Failed { error, .. }
            | CheckoutOutcome::ChargedButUnrecorded { error, .. } => Some(error),
        }
    }
}
