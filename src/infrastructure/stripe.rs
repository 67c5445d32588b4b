use crate::domain::money::{Amount, Currency};
use crate::domain::payment::{
    CardToken, ChargeId, ChargeReceipt, ChargeRequest, GatewayError, PaymentMethodReference,
};
use crate::domain::ports::PaymentGateway;
use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Stripe REST client implementing the gateway port.
///
/// The secret key is injected at construction; nothing here reads process
/// globals.
#[derive(Clone)]
pub struct StripeGateway {
    inner: Arc<StripeGatewayInner>,
}

struct StripeGatewayInner {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
}

#[derive(Debug, Deserialize)]
struct StripeCustomer {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripeCharge {
    id: String,
    amount: i64,
    currency: String,
    status: String,
    failure_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StripeErrorResponse {
    #[serde(default)]
    error: StripeErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct StripeErrorBody {
    #[serde(default, rename = "type")]
    kind: String,
    code: Option<String>,
    decline_code: Option<String>,
    message: Option<String>,
}

impl StripeErrorBody {
    fn reason(&self) -> String {
        self.decline_code
            .clone()
            .or_else(|| self.code.clone())
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| self.kind.clone())
    }
}

impl StripeGateway {
    pub fn new(secret_key: SecretString, api_base: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(StripeGatewayInner {
                client: reqwest::Client::new(),
                api_base: api_base.into().trim_end_matches('/').to_string(),
                secret_key,
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.api_base)
    }

    async fn error_body(response: reqwest::Response) -> StripeErrorBody {
        response
            .json::<StripeErrorResponse>()
            .await
            .map(|r| r.error)
            .unwrap_or_default()
    }
}

/// Maps a failed token exchange. Nothing is billed by this call, so every
/// transport problem is simply "unavailable".
fn classify_customer_error(status: StatusCode, body: &StripeErrorBody) -> GatewayError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::PAYMENT_REQUIRED | StatusCode::NOT_FOUND => {
            GatewayError::RejectedToken(body.reason())
        }
        _ => GatewayError::Unavailable(format!("stripe returned {status}: {}", body.reason())),
    }
}

/// Maps a failed charge call.
///
/// Only responses that prove the charge was not processed map to
/// `Unavailable`; a server error mid-charge leaves the outcome unknown.
fn classify_charge_error(status: StatusCode, body: &StripeErrorBody) -> GatewayError {
    match status {
        StatusCode::PAYMENT_REQUIRED => GatewayError::Declined(body.reason()),
        StatusCode::BAD_REQUEST if body.kind == "card_error" => {
            GatewayError::Declined(body.reason())
        }
        StatusCode::TOO_MANY_REQUESTS | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            GatewayError::Unavailable(format!("stripe returned {status}: {}", body.reason()))
        }
        s if s.is_client_error() => {
            GatewayError::Unavailable(format!("stripe rejected the request: {}", body.reason()))
        }
        _ => GatewayError::Ambiguous(format!("stripe returned {status}: {}", body.reason())),
    }
}

/// A charge request that never reached Stripe cannot have billed anyone.
fn classify_charge_transport(err: &reqwest::Error) -> GatewayError {
    if err.is_connect() || err.is_builder() {
        GatewayError::Unavailable(err.to_string())
    } else {
        GatewayError::Ambiguous(err.to_string())
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip_all)]
    async fn create_customer_from_token(
        &self,
        token: &CardToken,
    ) -> Result<PaymentMethodReference, GatewayError> {
        let response = self
            .inner
            .client
            .post(self.url("/v1/customers"))
            .bearer_auth(self.inner.secret_key.expose_secret())
            .form(&[("source", token.as_str())])
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_customer_error(status, &Self::error_body(response).await));
        }

        let customer: StripeCustomer = response
            .json()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("unreadable customer: {e}")))?;
        debug!(customer = %customer.id, "stripe customer created");
        PaymentMethodReference::new(customer.id)
            .map_err(|e| GatewayError::Unavailable(e.to_string()))
    }

    #[instrument(skip_all, fields(key = %request.idempotency_key))]
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, GatewayError> {
        let amount = request.amount.minor_units().to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", request.currency.as_str()),
            ("description", request.description.as_str()),
            ("customer", request.customer.as_str()),
        ];

        let response = self
            .inner
            .client
            .post(self.url("/v1/charges"))
            .bearer_auth(self.inner.secret_key.expose_secret())
            .header("Idempotency-Key", request.idempotency_key.as_str())
            .form(&form)
            .send()
            .await
            .map_err(|e| classify_charge_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_charge_error(status, &Self::error_body(response).await));
        }

        // The charge exists at this point; an unreadable body is not a failure.
        let charge: StripeCharge = response
            .json()
            .await
            .map_err(|e| GatewayError::Ambiguous(format!("unreadable charge: {e}")))?;
        if charge.status == "failed" {
            return Err(GatewayError::Declined(
                charge
                    .failure_message
                    .unwrap_or_else(|| "charge failed".to_string()),
            ));
        }

        let amount = Amount::new(charge.amount).unwrap_or(request.amount);
        let currency =
            Currency::new(&charge.currency).unwrap_or_else(|_| request.currency.clone());
        Ok(ChargeReceipt {
            charge_id: ChargeId(charge.id),
            amount,
            currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(kind: &str, code: Option<&str>) -> StripeErrorBody {
        StripeErrorBody {
            kind: kind.to_string(),
            code: code.map(str::to_string),
            decline_code: None,
            message: None,
        }
    }

    #[test]
    fn test_card_errors_are_declines() {
        let err = classify_charge_error(
            StatusCode::PAYMENT_REQUIRED,
            &body("card_error", Some("card_declined")),
        );
        assert_eq!(err, GatewayError::Declined("card_declined".to_string()));
    }

    #[test]
    fn test_server_errors_mid_charge_are_ambiguous() {
        let err =
            classify_charge_error(StatusCode::INTERNAL_SERVER_ERROR, &body("api_error", None));
        assert!(matches!(err, GatewayError::Ambiguous(_)));
        let err = classify_charge_error(StatusCode::TOO_MANY_REQUESTS, &body("", None));
        assert!(matches!(err, GatewayError::Unavailable(_)));
    }

    #[test]
    fn test_bad_tokens_are_rejected() {
        let err = classify_customer_error(
            StatusCode::BAD_REQUEST,
            &body("invalid_request_error", Some("token_already_used")),
        );
        assert_eq!(
            err,
            GatewayError::RejectedToken("token_already_used".to_string())
        );
        let err = classify_customer_error(StatusCode::BAD_GATEWAY, &body("api_error", None));
        assert!(matches!(err, GatewayError::Unavailable(_)));
    }

    #[test]
    fn test_decline_code_wins_over_code() {
        let mut b = body("card_error", Some("card_declined"));
        b.decline_code = Some("insufficient_funds".to_string());
        assert_eq!(b.reason(), "insufficient_funds");
    }
}
