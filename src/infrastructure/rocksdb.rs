use crate::domain::customer::{Customer, CustomerId};
use crate::domain::intent::{ChargeIntent, Claim, IdempotencyKey, IntentStatus};
use crate::domain::order::{NewOrder, Order, OrderId};
use crate::domain::payment::{ChargeId, PaymentMethodReference};
use crate::domain::ports::{ChargeIntentStore, CustomerVault, OrderStore};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for customer records (including the vaulted reference).
pub const CF_CUSTOMERS: &str = "customers";
/// Column Family for recorded orders.
pub const CF_ORDERS: &str = "orders";
/// Column Family for charge intents, keyed by idempotency key.
pub const CF_INTENTS: &str = "intents";
/// Column Family for counters and the charge id index.
pub const CF_META: &str = "meta";

const LAST_ORDER_ID: &[u8] = b"last_order_id";

fn charge_index_key(charge_id: &ChargeId) -> Vec<u8> {
    format!("charge:{charge_id}").into_bytes()
}

/// A persistent store of record using RocksDB.
///
/// Keeps customers, orders and charge intents in separate Column Families so
/// charge intents survive a crash and can be reconciled on the next run.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    /// Serialises read-modify-write sequences (intent claims, order ids).
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating
    /// any missing column family.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = [CF_CUSTOMERS, CF_ORDERS, CF_INTENTS, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> StoreResult<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> StoreResult<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(cf, key, bytes)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> StoreResult<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }

    fn cf(&self, name: &str) -> StoreResult<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Backend(format!("{name} column family not found")))
    }
}

#[async_trait]
impl CustomerVault for RocksDBStore {
    async fn find_reference(
        &self,
        customer_id: CustomerId,
    ) -> StoreResult<Option<PaymentMethodReference>> {
        let customer: Option<Customer> =
            self.read(CF_CUSTOMERS, &customer_id.0.to_be_bytes())?;
        Ok(customer.and_then(|c| c.payment_reference))
    }

    async fn save_reference(
        &self,
        customer_id: CustomerId,
        reference: PaymentMethodReference,
    ) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let key = customer_id.0.to_be_bytes();
        let mut customer: Customer = self
            .read(CF_CUSTOMERS, &key)?
            .unwrap_or_else(|| Customer::new(customer_id));
        customer.remember(reference);
        self.write(CF_CUSTOMERS, &key, &customer)
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn create_order(&self, order: NewOrder) -> StoreResult<Order> {
        let _guard = self.write_lock.lock().await;
        let index_key = charge_index_key(&order.charge_id);
        if let Some(id) = self.read::<u64>(CF_META, &index_key)?
            && let Some(existing) = self.read::<Order>(CF_ORDERS, &id.to_be_bytes())?
        {
            return Ok(existing);
        }

        let last: u64 = self.read(CF_META, LAST_ORDER_ID)?.unwrap_or(0);
        let order = Order::from_new(OrderId(last + 1), order, Utc::now());
        let id = serde_json::to_vec(&order.id.0)?;

        // Order, counter and index land together or not at all.
        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_ORDERS)?, order.id.0.to_be_bytes(), serde_json::to_vec(&order)?);
        batch.put_cf(self.cf(CF_META)?, LAST_ORDER_ID, &id);
        batch.put_cf(self.cf(CF_META)?, &index_key, &id);
        self.db.write(batch)?;
        Ok(order)
    }

    async fn orders_for_customer(&self, customer_id: CustomerId) -> StoreResult<Vec<Order>> {
        let orders: Vec<Order> = self.scan(CF_ORDERS)?;
        Ok(orders
            .into_iter()
            .filter(|o| o.customer_id == customer_id)
            .collect())
    }
}

#[async_trait]
impl ChargeIntentStore for RocksDBStore {
    async fn get(&self, key: &IdempotencyKey) -> StoreResult<Option<ChargeIntent>> {
        self.read(CF_INTENTS, key.as_str().as_bytes())
    }

    async fn try_begin(&self, intent: ChargeIntent) -> StoreResult<Claim> {
        let _guard = self.write_lock.lock().await;
        let key = intent.key.as_str().as_bytes().to_vec();
        let claim = Claim::decide(self.read(CF_INTENTS, &key)?, intent);
        if let Claim::Started(started) = &claim {
            self.write(CF_INTENTS, &key, started)?;
        }
        Ok(claim)
    }

    async fn store(&self, intent: ChargeIntent) -> StoreResult<()> {
        self.write(CF_INTENTS, intent.key.as_str().as_bytes(), &intent)
    }

    async fn list_by_status(&self, status: IntentStatus) -> StoreResult<Vec<ChargeIntent>> {
        let mut intents: Vec<ChargeIntent> = self
            .scan::<ChargeIntent>(CF_INTENTS)?
            .into_iter()
            .filter(|i| i.status == status)
            .collect();
        intents.sort_by_key(|i| i.created_at);
        Ok(intents)
    }
}
