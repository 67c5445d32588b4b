use crate::domain::customer::CustomerId;
use crate::domain::intent::IdempotencyKey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("invalid checkout request: {0}")]
    Validation(String),
    #[error("amount must be a positive number of minor units, got {0}")]
    InvalidAmount(i64),
    #[error("customer {0} has no stored payment method")]
    NoStoredPaymentMethod(CustomerId),
    #[error("payment gateway rejected the card token: {0}")]
    GatewayRejectedToken(String),
    #[error("card was declined: {0}")]
    ChargeDeclined(String),
    #[error("credit card vault unavailable: {0}")]
    VaultUnavailable(String),
    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("charge outcome unknown, reconciliation required: {0}")]
    ChargeOutcomeUnknown(String),
    #[error("failed to persist order: {0}")]
    OrderPersistFailure(String),
    #[error("charge intent store unavailable: {0}")]
    IntentStoreUnavailable(String),
    #[error("a checkout with idempotency key {0} is already in progress")]
    CheckoutInProgress(IdempotencyKey),
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Coarse outcome category used to pick a transport status for an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Malformed or ambiguous input. Nothing happened.
    ClientInput,
    /// The card or token was refused by the gateway.
    PaymentRefused,
    /// Another attempt under the same idempotency key is in flight.
    Conflict,
    /// A collaborator failed. Safe to retry only when no charge occurred.
    Dependency,
}

impl CheckoutError {
    /// Stable machine-readable code for the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::NoStoredPaymentMethod(_) => "no_stored_payment_method",
            Self::GatewayRejectedToken(_) => "gateway_rejected_token",
            Self::ChargeDeclined(_) => "charge_declined",
            Self::VaultUnavailable(_) => "vault_unavailable",
            Self::GatewayUnavailable(_) => "gateway_unavailable",
            Self::ChargeOutcomeUnknown(_) => "charge_outcome_unknown",
            Self::OrderPersistFailure(_) => "order_persist_failure",
            Self::IntentStoreUnavailable(_) => "intent_store_unavailable",
            Self::CheckoutInProgress(_) => "checkout_in_progress",
            Self::Storage(_) | Self::Io(_) | Self::Json(_) | Self::Csv(_) => "internal_error",
        }
    }

    pub fn status_class(&self) -> StatusClass {
        match self {
            Self::Validation(_)
            | Self::InvalidAmount(_)
            | Self::NoStoredPaymentMethod(_)
            | Self::Json(_) => StatusClass::ClientInput,
            Self::GatewayRejectedToken(_) | Self::ChargeDeclined(_) => StatusClass::PaymentRefused,
            Self::CheckoutInProgress(_) => StatusClass::Conflict,
            Self::VaultUnavailable(_)
            | Self::GatewayUnavailable(_)
            | Self::ChargeOutcomeUnknown(_)
            | Self::OrderPersistFailure(_)
            | Self::IntentStoreUnavailable(_)
            | Self::Storage(_)
            | Self::Io(_)
            | Self::Csv(_) => StatusClass::Dependency,
        }
    }

    /// HTTP-equivalent status for a checkout that ended in this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::Json(_) => 400,
            Self::InvalidAmount(_) | Self::NoStoredPaymentMethod(_) => 422,
            Self::GatewayRejectedToken(_) | Self::ChargeDeclined(_) => 402,
            Self::CheckoutInProgress(_) => 409,
            Self::VaultUnavailable(_)
            | Self::IntentStoreUnavailable(_)
            | Self::OrderPersistFailure(_) => 503,
            Self::GatewayUnavailable(_) | Self::ChargeOutcomeUnknown(_) => 502,
            Self::Storage(_) | Self::Io(_) | Self::Csv(_) => 500,
        }
    }

    /// Whether the client may resubmit the whole checkout from scratch.
    ///
    /// Never true once money may have moved.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::VaultUnavailable(_)
                | Self::GatewayUnavailable(_)
                | Self::IntentStoreUnavailable(_)
                | Self::CheckoutInProgress(_)
        )
    }
}

/// Failure reported by a storage port implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
}

pub type Result<T, E = CheckoutError> = std::result::Result<T, E>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;
