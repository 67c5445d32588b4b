use crate::domain::customer::{Customer, CustomerId};
use crate::domain::intent::{ChargeIntent, Claim, IdempotencyKey, IntentStatus};
use crate::domain::order::{NewOrder, Order, OrderId};
use crate::domain::payment::{ChargeId, PaymentMethodReference};
use crate::domain::ports::{ChargeIntentStore, CustomerVault, OrderStore};
use crate::error::StoreResult;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    customers: HashMap<CustomerId, Customer>,
    orders: BTreeMap<OrderId, Order>,
    orders_by_charge: HashMap<ChargeId, OrderId>,
    intents: HashMap<IdempotencyKey, ChargeIntent>,
    last_order_id: u64,
}

/// A thread-safe in-memory store of record.
///
/// Implements every storage port over one `Arc<RwLock<..>>`, so clones share
/// state. Ideal for testing or a single-process run where persistence is not
/// required.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a customer record, as sign-up would.
    pub async fn register_customer(&self, customer: Customer) {
        let mut tables = self.tables.write().await;
        tables.customers.insert(customer.id, customer);
    }

    pub async fn customer(&self, customer_id: CustomerId) -> Option<Customer> {
        let tables = self.tables.read().await;
        tables.customers.get(&customer_id).cloned()
    }
}

#[async_trait]
impl CustomerVault for InMemoryStore {
    async fn find_reference(
        &self,
        customer_id: CustomerId,
    ) -> StoreResult<Option<PaymentMethodReference>> {
        let tables = self.tables.read().await;
        Ok(tables
            .customers
            .get(&customer_id)
            .and_then(|c| c.payment_reference.clone()))
    }

    async fn save_reference(
        &self,
        customer_id: CustomerId,
        reference: PaymentMethodReference,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .customers
            .entry(customer_id)
            .or_insert_with(|| Customer::new(customer_id))
            .remember(reference);
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn create_order(&self, order: NewOrder) -> StoreResult<Order> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .orders_by_charge
            .get(&order.charge_id)
            .and_then(|id| tables.orders.get(id))
        {
            return Ok(existing.clone());
        }
        tables.last_order_id += 1;
        let order = Order::from_new(OrderId(tables.last_order_id), order, Utc::now());
        tables.orders_by_charge.insert(order.charge_id.clone(), order.id);
        tables.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn orders_for_customer(&self, customer_id: CustomerId) -> StoreResult<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ChargeIntentStore for InMemoryStore {
    async fn get(&self, key: &IdempotencyKey) -> StoreResult<Option<ChargeIntent>> {
        let tables = self.tables.read().await;
        Ok(tables.intents.get(key).cloned())
    }

    async fn try_begin(&self, intent: ChargeIntent) -> StoreResult<Claim> {
        let mut tables = self.tables.write().await;
        let claim = Claim::decide(tables.intents.get(&intent.key).cloned(), intent);
        if let Claim::Started(started) = &claim {
            tables.intents.insert(started.key.clone(), started.clone());
        }
        Ok(claim)
    }

    async fn store(&self, intent: ChargeIntent) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.intents.insert(intent.key.clone(), intent);
        Ok(())
    }

    async fn list_by_status(&self, status: IntentStatus) -> StoreResult<Vec<ChargeIntent>> {
        let tables = self.tables.read().await;
        let mut intents: Vec<ChargeIntent> = tables
            .intents
            .values()
            .filter(|i| i.status == status)
            .cloned()
            .collect();
        intents.sort_by_key(|i| i.created_at);
        Ok(intents)
    }
}
