use crate::domain::checkout::PaymentSource;
use crate::domain::customer::CustomerId;
use crate::domain::payment::{GatewayError, PaymentMethodReference};
use crate::domain::ports::{GatewayRef, VaultRef};
use crate::error::{CheckoutError, Result};
use std::time::Duration;
use tracing::{debug, warn};

/// A chargeable reference, and whether it should be vaulted once charged.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub reference: PaymentMethodReference,
    pub remember: bool,
}

/// Nothing is billed by a token exchange, so an ambiguous outcome is just
/// another outage.
fn token_exchange_error(err: GatewayError) -> CheckoutError {
    match err {
        GatewayError::RejectedToken(reason) | GatewayError::Declined(reason) => {
            CheckoutError::GatewayRejectedToken(reason)
        }
        GatewayError::Unavailable(reason) | GatewayError::Ambiguous(reason) => {
            CheckoutError::GatewayUnavailable(reason)
        }
    }
}

/// Decides which gateway reference a checkout charges.
#[derive(Clone)]
pub struct PaymentMethodResolver {
    vault: VaultRef,
    gateway: GatewayRef,
    timeout: Duration,
}

impl PaymentMethodResolver {
    pub fn new(vault: VaultRef, gateway: GatewayRef, timeout: Duration) -> Self {
        Self {
            vault,
            gateway,
            timeout,
        }
    }

    pub async fn resolve(
        &self,
        customer_id: CustomerId,
        source: &PaymentSource,
    ) -> Result<Resolution> {
        match source {
            PaymentSource::Existing => {
                let reference = self
                    .vault
                    .find_reference(customer_id)
                    .await
                    .map_err(|e| CheckoutError::VaultUnavailable(e.to_string()))?
                    .ok_or(CheckoutError::NoStoredPaymentMethod(customer_id))?;
                debug!(%customer_id, "using vaulted payment method");
                Ok(Resolution {
                    reference,
                    remember: false,
                })
            }
            PaymentSource::NewToken { token, remember } => {
                let exchange = self.gateway.create_customer_from_token(token);
                let reference = match tokio::time::timeout(self.timeout, exchange).await {
                    Ok(exchanged) => exchanged.map_err(token_exchange_error)?,
                    Err(_) => {
                        return Err(CheckoutError::GatewayUnavailable(format!(
                            "token exchange timed out after {:?}",
                            self.timeout
                        )));
                    }
                };
                debug!(%customer_id, %reference, "created gateway customer from token");
                Ok(Resolution {
                    reference,
                    remember: *remember,
                })
            }
        }
    }

    /// Vaults a new card after its first charge went through.
    ///
    /// The checkout has already succeeded, so a failed write only yields a
    /// warning for the caller.
    pub async fn remember(
        &self,
        customer_id: CustomerId,
        reference: PaymentMethodReference,
    ) -> Option<String> {
        match self.vault.save_reference(customer_id, reference).await {
            Ok(()) => {
                debug!(%customer_id, "remembered card for later use");
                None
            }
            Err(e) => {
                warn!(%customer_id, error = %e, "could not remember card, continuing checkout");
                Some(format!("card could not be saved for later use: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{BrokenStore, gateway, store};
    use crate::domain::payment::CardToken;
    use crate::domain::ports::CustomerVault;
    use std::sync::Arc;

    fn resolver(vault: VaultRef) -> PaymentMethodResolver {
        PaymentMethodResolver::new(vault, gateway(), Duration::from_secs(1))
    }

    fn new_token(token: &str, remember: bool) -> PaymentSource {
        PaymentSource::NewToken {
            token: CardToken::new(token).unwrap(),
            remember,
        }
    }

    #[tokio::test]
    async fn test_existing_without_vaulted_reference() {
        let gateway = gateway();
        let resolver = PaymentMethodResolver::new(store(), gateway.clone(), Duration::from_secs(1));

        let result = resolver.resolve(CustomerId(1), &PaymentSource::Existing).await;
        assert!(matches!(
            result,
            Err(CheckoutError::NoStoredPaymentMethod(CustomerId(1)))
        ));
        assert_eq!(gateway.customers_created(), 0);
    }

    #[tokio::test]
    async fn test_existing_with_broken_vault() {
        let result = resolver(Arc::new(BrokenStore))
            .resolve(CustomerId(1), &PaymentSource::Existing)
            .await;
        assert!(matches!(result, Err(CheckoutError::VaultUnavailable(_))));
    }

    #[tokio::test]
    async fn test_resolving_a_new_card_does_not_vault_it() {
        let vault = store();
        let resolver = resolver(vault.clone());

        let resolution = resolver
            .resolve(CustomerId(3), &new_token("tok_visa", true))
            .await
            .unwrap();
        assert!(resolution.remember);
        assert!(vault.find_reference(CustomerId(3)).await.unwrap().is_none());

        let warning = resolver
            .remember(CustomerId(3), resolution.reference.clone())
            .await;
        assert!(warning.is_none());
        let stored = vault.find_reference(CustomerId(3)).await.unwrap();
        assert_eq!(stored, Some(resolution.reference));
    }

    #[tokio::test]
    async fn test_unremembered_token_is_not_flagged() {
        let resolution = resolver(store())
            .resolve(CustomerId(3), &new_token("tok_visa", false))
            .await
            .unwrap();
        assert!(!resolution.remember);
    }

    #[tokio::test]
    async fn test_vault_write_failure_is_only_a_warning() {
        let resolver = resolver(Arc::new(BrokenStore));
        let warning = resolver
            .remember(CustomerId(3), PaymentMethodReference::new("cus_abc").unwrap())
            .await;
        assert!(warning.is_some());
    }

    #[tokio::test]
    async fn test_rejected_and_unavailable_tokens() {
        let resolver = resolver(store());

        let rejected = resolver
            .resolve(CustomerId(1), &new_token("tok_invalid", false))
            .await;
        assert!(matches!(rejected, Err(CheckoutError::GatewayRejectedToken(_))));

        let unavailable = resolver
            .resolve(CustomerId(1), &new_token("tok_unavailable", false))
            .await;
        assert!(matches!(unavailable, Err(CheckoutError::GatewayUnavailable(_))));
    }
}
