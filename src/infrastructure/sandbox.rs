use crate::domain::intent::IdempotencyKey;
use crate::domain::payment::{
    CardToken, ChargeId, ChargeReceipt, ChargeRequest, GatewayError, PaymentMethodReference,
};
use crate::domain::ports::PaymentGateway;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// How a sandbox card behaves when charged. Chosen by the token it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CardBehaviour {
    Approve,
    Decline,
    Ambiguous,
}

#[derive(Default)]
struct Ledger {
    next_id: u64,
    cards: HashMap<String, CardBehaviour>,
    /// First definite answer per key, with the request that produced it.
    charges: HashMap<IdempotencyKey, (ChargeRequest, Result<ChargeReceipt, GatewayError>)>,
}

/// Deterministic in-process gateway following the Stripe test-token conventions.
///
/// - tokens must start with `tok_`; `tok_invalid` and `tok_expired` are rejected
/// - `tok_unavailable` fails the token exchange as a transport error
/// - cards from `tok_chargeDeclined` are declined when charged
/// - cards from `tok_chargeAmbiguous` end every charge with an unknown outcome
/// - any other token, and any reference the sandbox never issued, is approved
///
/// Charges are deduplicated on the idempotency key the way Stripe does: the
/// first approval or decline is replayed, and reusing a key with different
/// parameters is refused.
#[derive(Default, Clone)]
pub struct SandboxGateway {
    ledger: Arc<Mutex<Ledger>>,
    customers_created: Arc<AtomicUsize>,
    charges_made: Arc<AtomicUsize>,
    latency: Option<Duration>,
}

impl SandboxGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every call, for exercising timeouts.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn customers_created(&self) -> usize {
        self.customers_created.load(Ordering::SeqCst)
    }

    /// Charges actually billed (deduplicated retries are not counted).
    pub fn charges_made(&self) -> usize {
        self.charges_made.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn create_customer_from_token(
        &self,
        token: &CardToken,
    ) -> Result<PaymentMethodReference, GatewayError> {
        self.simulate_latency().await;

        let behaviour = match token.as_str() {
            "tok_invalid" | "tok_expired" => {
                return Err(GatewayError::RejectedToken(format!(
                    "no such token: {}",
                    token.as_str()
                )));
            }
            "tok_unavailable" => {
                return Err(GatewayError::Unavailable(
                    "sandbox connection refused".to_string(),
                ));
            }
            "tok_chargeDeclined" => CardBehaviour::Decline,
            "tok_chargeAmbiguous" => CardBehaviour::Ambiguous,
            t if t.starts_with("tok_") => CardBehaviour::Approve,
            _ => {
                return Err(GatewayError::RejectedToken(
                    "malformed token".to_string(),
                ));
            }
        };

        let mut ledger = self.ledger.lock().await;
        ledger.next_id += 1;
        let id = format!("cus_sbx_{:06}", ledger.next_id);
        ledger.cards.insert(id.clone(), behaviour);
        self.customers_created.fetch_add(1, Ordering::SeqCst);

        PaymentMethodReference::new(id).map_err(|e| GatewayError::Unavailable(e.to_string()))
    }

    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, GatewayError> {
        self.simulate_latency().await;

        let mut ledger = self.ledger.lock().await;
        if let Some((first, outcome)) = ledger.charges.get(&request.idempotency_key) {
            if first != request {
                return Err(GatewayError::Unavailable(format!(
                    "idempotency_error: key {} was used with different parameters",
                    request.idempotency_key
                )));
            }
            return outcome.clone();
        }

        let behaviour = ledger
            .cards
            .get(request.customer.as_str())
            .copied()
            .unwrap_or(CardBehaviour::Approve);

        let outcome = match behaviour {
            CardBehaviour::Decline => Err(GatewayError::Declined("card_declined".to_string())),
            CardBehaviour::Ambiguous => {
                return Err(GatewayError::Ambiguous(
                    "sandbox lost the response".to_string(),
                ));
            }
            CardBehaviour::Approve => {
                self.charges_made.fetch_add(1, Ordering::SeqCst);
                // Unique across runs: stored orders are keyed by charge id.
                Ok(ChargeReceipt {
                    charge_id: ChargeId(format!("ch_sbx_{}", Uuid::new_v4().simple())),
                    amount: request.amount,
                    currency: request.currency.clone(),
                })
            }
        };
        ledger.charges.insert(
            request.idempotency_key.clone(),
            (request.clone(), outcome.clone()),
        );
        outcome
    }
}
