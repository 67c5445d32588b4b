use super::customer::CustomerId;
use super::intent::{ChargeIntent, Claim, IdempotencyKey, IntentStatus};
use super::order::{NewOrder, Order};
use super::payment::{CardToken, ChargeReceipt, ChargeRequest, GatewayError, PaymentMethodReference};
use crate::error::StoreResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Maps internal customers to gateway-issued payment references.
#[async_trait]
pub trait CustomerVault: Send + Sync {
    async fn find_reference(&self, customer_id: CustomerId)
    -> StoreResult<Option<PaymentMethodReference>>;
    /// Last writer wins.
    async fn save_reference(
        &self,
        customer_id: CustomerId,
        reference: PaymentMethodReference,
    ) -> StoreResult<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists at most one order per charge.
    ///
    /// If an order already exists for `order.charge_id` it is returned and
    /// nothing is written; the check and the insert are atomic.
    async fn create_order(&self, order: NewOrder) -> StoreResult<Order>;
    async fn orders_for_customer(&self, customer_id: CustomerId) -> StoreResult<Vec<Order>>;
}

#[async_trait]
pub trait ChargeIntentStore: Send + Sync {
    async fn get(&self, key: &IdempotencyKey) -> StoreResult<Option<ChargeIntent>>;
    /// Atomically claims `intent.key`, as decided by [`Claim::decide`].
    ///
    /// On `Claim::Started` the returned intent has been written; a reclaimed
    /// `Failed` key carries the next attempt number.
    async fn try_begin(&self, intent: ChargeIntent) -> StoreResult<Claim>;
    async fn store(&self, intent: ChargeIntent) -> StoreResult<()>;
    async fn list_by_status(&self, status: IntentStatus) -> StoreResult<Vec<ChargeIntent>>;
}

/// The external card processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_customer_from_token(
        &self,
        token: &CardToken,
    ) -> Result<PaymentMethodReference, GatewayError>;
    /// Bills at most once per accepted call. Not idempotent unless the
    /// implementation honours `request.idempotency_key`.
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, GatewayError>;
}

pub type VaultRef = Arc<dyn CustomerVault>;
pub type OrderStoreRef = Arc<dyn OrderStore>;
pub type IntentStoreRef = Arc<dyn ChargeIntentStore>;
pub type GatewayRef = Arc<dyn PaymentGateway>;
