use crate::domain::checkout::{CheckoutRequest, PaymentSource};
use crate::domain::customer::CustomerId;
use crate::domain::intent::IdempotencyKey;
use crate::domain::money::{Amount, Currency};
use crate::domain::order::{OrderDraft, ProductId};
use crate::domain::payment::CardToken;
use crate::error::{CheckoutError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

/// A checkout request as the storefront client sends it.
///
/// Nothing here is trusted: `validate` turns it into an unambiguous
/// `CheckoutRequest` or rejects it before any side effect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutPayload {
    pub customer_id: u64,
    pub product_id: u64,
    /// Price in minor units under the storefront's field name, e.g. `1999`.
    #[serde(default)]
    pub sell_price: Option<Decimal>,
    /// Price in minor units, e.g. `1999`.
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, rename = "rememberCard")]
    pub remember_card: bool,
    #[serde(default, rename = "useExisting")]
    pub use_existing: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, rename = "idempotencyKey")]
    pub idempotency_key: Option<String>,
}

/// A request that passed validation, plus whatever was silently dropped.
#[derive(Debug)]
pub struct ValidatedRequest {
    pub request: CheckoutRequest,
    pub warnings: Vec<String>,
}

impl CheckoutPayload {
    pub fn validate(self, default_currency: &Currency) -> Result<ValidatedRequest> {
        let mut warnings = Vec::new();

        let currency = match self.currency.as_deref() {
            Some(code) => Currency::new(code)?,
            None => default_currency.clone(),
        };

        let amount = match (self.amount, self.sell_price) {
            (Some(minor), None) => Amount::new(minor)?,
            (None, Some(price)) => Amount::from_minor_decimal(price)?,
            (Some(_), Some(_)) => {
                return Err(CheckoutError::Validation(
                    "give either amount or sell_price, not both".to_string(),
                ));
            }
            (None, None) => {
                return Err(CheckoutError::Validation(
                    "amount or sell_price is required".to_string(),
                ));
            }
        };

        let token = self
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let source = if self.use_existing {
            if token.is_some() {
                warn!(
                    customer_id = self.customer_id,
                    "token ignored in favour of the stored card"
                );
                warnings.push("token ignored: useExisting takes precedence".to_string());
            }
            if self.remember_card {
                warnings.push("rememberCard ignored: useExisting takes precedence".to_string());
            }
            PaymentSource::Existing
        } else {
            let token = token.ok_or_else(|| {
                CheckoutError::Validation(
                    "a card token is required unless useExisting is set".to_string(),
                )
            })?;
            PaymentSource::NewToken {
                token: CardToken::new(token)?,
                remember: self.remember_card,
            }
        };

        let idempotency_key = self
            .idempotency_key
            .as_deref()
            .map(IdempotencyKey::new)
            .transpose()?;

        Ok(ValidatedRequest {
            request: CheckoutRequest {
                order: OrderDraft {
                    customer_id: CustomerId(self.customer_id),
                    product_id: ProductId(self.product_id),
                    amount,
                    currency,
                },
                source,
                idempotency_key,
            },
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> CheckoutPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_new_card_request() {
        let validated = payload(
            r#"{"customer_id": 1, "product_id": 2, "amount": 1999, "token": "tok_visa", "rememberCard": true, "idempotencyKey": "k1"}"#,
        )
        .validate(&Currency::usd())
        .unwrap();

        let request = validated.request;
        assert_eq!(request.order.amount.minor_units(), 1999);
        assert_eq!(request.order.currency, Currency::usd());
        assert!(matches!(
            request.source,
            PaymentSource::NewToken { remember: true, .. }
        ));
        assert_eq!(request.idempotency_key.unwrap().as_str(), "k1");
        assert!(validated.warnings.is_empty());
    }

    #[test]
    fn test_sell_price_is_minor_units() {
        let validated = payload(
            r#"{"customer_id": 1, "product_id": 2, "sell_price": 1999, "currency": "EUR", "token": "tok_visa"}"#,
        )
        .validate(&Currency::usd())
        .unwrap();
        assert_eq!(validated.request.order.amount.minor_units(), 1999);
        assert_eq!(validated.request.order.currency.as_str(), "eur");

        let fractional = payload(
            r#"{"customer_id": 1, "product_id": 2, "sell_price": 19.99, "token": "tok_visa"}"#,
        );
        assert!(matches!(
            fractional.validate(&Currency::usd()),
            Err(CheckoutError::Validation(_))
        ));
    }

    #[test]
    fn test_use_existing_wins_over_token() {
        let validated = payload(
            r#"{"customer_id": 1, "product_id": 2, "amount": 500, "useExisting": true, "token": "tok_visa", "rememberCard": true}"#,
        )
        .validate(&Currency::usd())
        .unwrap();
        assert_eq!(validated.request.source, PaymentSource::Existing);
        assert_eq!(validated.warnings.len(), 2);
    }

    #[test]
    fn test_rejections() {
        let usd = Currency::usd();
        let no_source = payload(r#"{"customer_id": 1, "product_id": 2, "amount": 500}"#);
        assert!(matches!(no_source.validate(&usd), Err(CheckoutError::Validation(_))));

        let blank_token =
            payload(r#"{"customer_id": 1, "product_id": 2, "amount": 500, "token": "  "}"#);
        assert!(matches!(blank_token.validate(&usd), Err(CheckoutError::Validation(_))));

        let zero =
            payload(r#"{"customer_id": 1, "product_id": 2, "amount": 0, "token": "tok_visa"}"#);
        assert!(matches!(zero.validate(&usd), Err(CheckoutError::InvalidAmount(0))));

        let both = payload(
            r#"{"customer_id": 1, "product_id": 2, "amount": 500, "sell_price": 500, "token": "tok_visa"}"#,
        );
        assert!(matches!(both.validate(&usd), Err(CheckoutError::Validation(_))));

        let neither = payload(r#"{"customer_id": 1, "product_id": 2, "token": "tok_visa"}"#);
        assert!(matches!(neither.validate(&usd), Err(CheckoutError::Validation(_))));
    }
}
