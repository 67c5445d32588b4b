use crate::domain::intent::IdempotencyKey;
use crate::domain::money::{Amount, Currency};
use crate::domain::payment::{ChargeReceipt, ChargeRequest, GatewayError, PaymentMethodReference};
use crate::domain::ports::GatewayRef;
use crate::error::{CheckoutError, Result};
use std::time::Duration;
use tracing::{info, warn};

/// Performs exactly one charge attempt against the gateway.
///
/// Never retries: a blind retry of a non-idempotent charge risks billing twice,
/// so retry policy belongs to the orchestrator.
#[derive(Clone)]
pub struct ChargeExecutor {
    gateway: GatewayRef,
    timeout: Duration,
}

impl ChargeExecutor {
    pub fn new(gateway: GatewayRef, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    /// Entry point for raw minor-unit amounts. Rejects non-positive amounts
    /// before touching the network.
    pub async fn execute_minor(
        &self,
        minor_units: i64,
        currency: &Currency,
        description: &str,
        reference: &PaymentMethodReference,
        key: &IdempotencyKey,
    ) -> Result<ChargeReceipt> {
        let amount = Amount::new(minor_units)?;
        self.execute(amount, currency, description, reference, key)
            .await
    }

    pub async fn execute(
        &self,
        amount: Amount,
        currency: &Currency,
        description: &str,
        reference: &PaymentMethodReference,
        key: &IdempotencyKey,
    ) -> Result<ChargeReceipt> {
        let request = ChargeRequest {
            amount,
            currency: currency.clone(),
            description: description.to_string(),
            customer: reference.clone(),
            idempotency_key: key.clone(),
        };

        match tokio::time::timeout(self.timeout, self.gateway.charge(&request)).await {
            Ok(Ok(receipt)) => {
                info!(%key, charge_id = %receipt.charge_id, %amount, %currency, "charge confirmed");
                Ok(receipt)
            }
            Ok(Err(GatewayError::Declined(reason) | GatewayError::RejectedToken(reason))) => {
                info!(%key, %reason, "charge declined");
                Err(CheckoutError::ChargeDeclined(reason))
            }
            Ok(Err(GatewayError::Unavailable(reason))) => {
                warn!(%key, %reason, "gateway unavailable, nothing charged");
                Err(CheckoutError::GatewayUnavailable(reason))
            }
            Ok(Err(GatewayError::Ambiguous(reason))) => {
                warn!(%key, %reason, "charge outcome unknown");
                Err(CheckoutError::ChargeOutcomeUnknown(reason))
            }
            Err(_) => {
                warn!(%key, timeout = ?self.timeout, "charge timed out, outcome unknown");
                Err(CheckoutError::ChargeOutcomeUnknown(format!(
                    "no gateway response within {:?}",
                    self.timeout
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::gateway;
    use crate::domain::payment::CardToken;
    use crate::domain::ports::PaymentGateway;
    use crate::infrastructure::sandbox::SandboxGateway;
    use std::sync::Arc;

    async fn reference(gateway: &SandboxGateway, token: &str) -> PaymentMethodReference {
        gateway
            .create_customer_from_token(&CardToken::new(token).unwrap())
            .await
            .unwrap()
    }

    fn key() -> IdempotencyKey {
        IdempotencyKey::new("charge-test").unwrap()
    }

    #[tokio::test]
    async fn test_non_positive_amount_never_reaches_gateway() {
        let gateway = gateway();
        let executor = ChargeExecutor::new(gateway.clone(), Duration::from_secs(1));
        let reference = PaymentMethodReference::new("cus_abc").unwrap();

        for amount in [0, -1999] {
            let result = executor
                .execute_minor(amount, &Currency::usd(), "desc", &reference, &key())
                .await;
            assert!(matches!(result, Err(CheckoutError::InvalidAmount(a)) if a == amount));
        }
        assert_eq!(gateway.charges_made(), 0);
    }

    #[tokio::test]
    async fn test_successful_charge() {
        let gateway = gateway();
        let executor = ChargeExecutor::new(gateway.clone(), Duration::from_secs(1));
        let reference = reference(&gateway, "tok_visa").await;

        let receipt = executor
            .execute_minor(1999, &Currency::usd(), "desc", &reference, &key())
            .await
            .unwrap();
        assert_eq!(receipt.amount.minor_units(), 1999);
        assert_eq!(gateway.charges_made(), 1);
    }

    #[tokio::test]
    async fn test_decline_and_ambiguous_are_distinguishable() {
        let gateway = gateway();
        let executor = ChargeExecutor::new(gateway.clone(), Duration::from_secs(1));
        let amount = Amount::new(100).unwrap();

        let declining = reference(&gateway, "tok_chargeDeclined").await;
        let declined = executor
            .execute(amount, &Currency::usd(), "desc", &declining, &key())
            .await;
        assert!(matches!(declined, Err(CheckoutError::ChargeDeclined(_))));

        let ambiguous = reference(&gateway, "tok_chargeAmbiguous").await;
        let other_key = IdempotencyKey::new("charge-test-2").unwrap();
        let unknown = executor
            .execute(amount, &Currency::usd(), "desc", &ambiguous, &other_key)
            .await;
        assert!(matches!(unknown, Err(CheckoutError::ChargeOutcomeUnknown(_))));
    }

    #[tokio::test]
    async fn test_timeout_is_an_unknown_outcome() {
        let slow = Arc::new(SandboxGateway::new().with_latency(Duration::from_millis(200)));
        let executor = ChargeExecutor::new(slow, Duration::from_millis(10));
        let reference = PaymentMethodReference::new("cus_abc").unwrap();

        let result = executor
            .execute_minor(100, &Currency::usd(), "desc", &reference, &key())
            .await;
        assert!(matches!(result, Err(CheckoutError::ChargeOutcomeUnknown(_))));
    }
}
