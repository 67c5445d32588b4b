#![allow(dead_code)]

use async_trait::async_trait;
use checkout::application::orchestrator::{CheckoutOrchestrator, Ports};
use checkout::config::CheckoutConfig;
use checkout::domain::checkout::{CheckoutRequest, PaymentSource};
use checkout::domain::customer::CustomerId;
use checkout::domain::money::{Amount, Currency};
use checkout::domain::order::{NewOrder, Order, OrderDraft, ProductId};
use checkout::domain::payment::{
    CardToken, ChargeId, ChargeReceipt, ChargeRequest, GatewayError, PaymentMethodReference,
};
use checkout::domain::ports::{OrderStore, PaymentGateway};
use checkout::error::{StoreError, StoreResult};
use checkout::infrastructure::in_memory::InMemoryStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Gateway double that answers with fixed ids and counts every call.
pub struct FakeGateway {
    pub customer_calls: AtomicUsize,
    pub charge_calls: AtomicUsize,
    pub charge_error: Option<GatewayError>,
    pub charges: Mutex<Vec<ChargeRequest>>,
}

impl FakeGateway {
    pub fn approving() -> Self {
        Self {
            customer_calls: AtomicUsize::new(0),
            charge_calls: AtomicUsize::new(0),
            charge_error: None,
            charges: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: GatewayError) -> Self {
        Self {
            charge_error: Some(error),
            ..Self::approving()
        }
    }

    pub fn customer_calls(&self) -> usize {
        self.customer_calls.load(Ordering::SeqCst)
    }

    pub fn charge_calls(&self) -> usize {
        self.charge_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.customer_calls() + self.charge_calls()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_customer_from_token(
        &self,
        _token: &CardToken,
    ) -> Result<PaymentMethodReference, GatewayError> {
        self.customer_calls.fetch_add(1, Ordering::SeqCst);
        Ok(PaymentMethodReference::new("cus_abc").unwrap())
    }

    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, GatewayError> {
        self.charge_calls.fetch_add(1, Ordering::SeqCst);
        self.charges.lock().unwrap().push(request.clone());
        match &self.charge_error {
            Some(error) => Err(error.clone()),
            None => Ok(ChargeReceipt {
                charge_id: ChargeId("ch_1".to_string()),
                amount: request.amount,
                currency: request.currency.clone(),
            }),
        }
    }
}

/// Gateway double with Stripe's idempotency rules: the first response per key
/// is cached and a reused key with different parameters is refused.
///
/// Customers are named after their token; cards from tokens containing `bad`
/// are declined.
#[derive(Default)]
pub struct IdempotentGateway {
    responses: Mutex<HashMap<String, (ChargeRequest, Result<ChargeReceipt, GatewayError>)>>,
    pub seen: Mutex<Vec<(String, String)>>,
    charges_billed: AtomicUsize,
}

impl IdempotentGateway {
    pub fn charges_billed(&self) -> usize {
        self.charges_billed.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<(String, String)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for IdempotentGateway {
    async fn create_customer_from_token(
        &self,
        token: &CardToken,
    ) -> Result<PaymentMethodReference, GatewayError> {
        Ok(PaymentMethodReference::new(format!("cus_{}", token.as_str())).unwrap())
    }

    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, GatewayError> {
        let key = request.idempotency_key.as_str().to_string();
        self.seen
            .lock()
            .unwrap()
            .push((key.clone(), request.customer.as_str().to_string()));

        let mut responses = self.responses.lock().unwrap();
        if let Some((first, response)) = responses.get(&key) {
            if first != request {
                return Err(GatewayError::Unavailable(
                    "idempotency_error: keys can only be reused with the same parameters"
                        .to_string(),
                ));
            }
            return response.clone();
        }

        let response = if request.customer.as_str().contains("bad") {
            Err(GatewayError::Declined("card_declined".to_string()))
        } else {
            let billed = self.charges_billed.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(ChargeReceipt {
                charge_id: ChargeId(format!("ch_{billed}")),
                amount: request.amount,
                currency: request.currency.clone(),
            })
        };
        responses.insert(key, (request.clone(), response.clone()));
        response
    }
}

/// Order store that refuses writes until `heal` is called.
#[derive(Default)]
pub struct FlakyOrderStore {
    pub inner: InMemoryStore,
    pub healed: AtomicUsize,
    pub latency: Option<Duration>,
}

impl FlakyOrderStore {
    /// Slows every call, widening the window for racing writers.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn heal(&self) {
        self.healed.store(1, Ordering::SeqCst);
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl OrderStore for FlakyOrderStore {
    async fn create_order(&self, order: NewOrder) -> StoreResult<Order> {
        self.simulate_latency().await;
        if self.healed.load(Ordering::SeqCst) == 0 {
            return Err(StoreError::Backend("orders table locked".to_string()));
        }
        self.inner.create_order(order).await
    }

    async fn orders_for_customer(&self, customer_id: CustomerId) -> StoreResult<Vec<Order>> {
        self.simulate_latency().await;
        self.inner.orders_for_customer(customer_id).await
    }
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub gateway: Arc<FakeGateway>,
    pub orchestrator: CheckoutOrchestrator,
}

pub fn harness(gateway: FakeGateway) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let gateway = Arc::new(gateway);
    let orchestrator = CheckoutOrchestrator::new(
        Ports {
            vault: store.clone(),
            orders: store.clone(),
            intents: store.clone(),
            gateway: gateway.clone(),
        },
        &CheckoutConfig::default(),
    );
    Harness {
        store,
        gateway,
        orchestrator,
    }
}

pub fn draft(customer: u64, minor_units: i64) -> OrderDraft {
    OrderDraft {
        customer_id: CustomerId(customer),
        product_id: ProductId(42),
        amount: Amount::new(minor_units).unwrap(),
        currency: Currency::usd(),
    }
}

pub fn with_token(order: OrderDraft, token: &str, remember: bool) -> CheckoutRequest {
    CheckoutRequest {
        order,
        source: PaymentSource::NewToken {
            token: CardToken::new(token).unwrap(),
            remember,
        },
        idempotency_key: None,
    }
}

pub fn with_existing(order: OrderDraft) -> CheckoutRequest {
    CheckoutRequest {
        order,
        source: PaymentSource::Existing,
        idempotency_key: None,
    }
}
