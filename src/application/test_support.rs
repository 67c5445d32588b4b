//! Shared fixtures for the application-layer unit tests.

use crate::domain::customer::CustomerId;
use crate::domain::intent::{ChargeIntent, Claim, IdempotencyKey, IntentStatus};
use crate::domain::money::{Amount, Currency};
use crate::domain::order::{NewOrder, Order, OrderDraft, ProductId};
use crate::domain::payment::PaymentMethodReference;
use crate::domain::ports::{ChargeIntentStore, CustomerVault, OrderStore};
use crate::error::{StoreError, StoreResult};
use crate::infrastructure::in_memory::InMemoryStore;
use crate::infrastructure::sandbox::SandboxGateway;
use async_trait::async_trait;
use std::sync::Arc;

pub(crate) fn store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new())
}

pub(crate) fn gateway() -> Arc<SandboxGateway> {
    Arc::new(SandboxGateway::new())
}

pub(crate) fn draft() -> OrderDraft {
    OrderDraft {
        customer_id: CustomerId(1),
        product_id: ProductId(42),
        amount: Amount::new(1999).unwrap(),
        currency: Currency::usd(),
    }
}

/// A store whose every call fails, standing in for a database that is down.
pub(crate) struct BrokenStore;

fn down<T>() -> StoreResult<T> {
    Err(StoreError::Backend("connection refused".to_string()))
}

#[async_trait]
impl CustomerVault for BrokenStore {
    async fn find_reference(&self, _: CustomerId) -> StoreResult<Option<PaymentMethodReference>> {
        down()
    }

    async fn save_reference(&self, _: CustomerId, _: PaymentMethodReference) -> StoreResult<()> {
        down()
    }
}

#[async_trait]
impl OrderStore for BrokenStore {
    async fn create_order(&self, _: NewOrder) -> StoreResult<Order> {
        down()
    }

    async fn orders_for_customer(&self, _: CustomerId) -> StoreResult<Vec<Order>> {
        down()
    }
}

#[async_trait]
impl ChargeIntentStore for BrokenStore {
    async fn get(&self, _: &IdempotencyKey) -> StoreResult<Option<ChargeIntent>> {
        down()
    }

    async fn try_begin(&self, _: ChargeIntent) -> StoreResult<Claim> {
        down()
    }

    async fn store(&self, _: ChargeIntent) -> StoreResult<()> {
        down()
    }

    async fn list_by_status(&self, _: IntentStatus) -> StoreResult<Vec<ChargeIntent>> {
        down()
    }
}
