use crate::domain::checkout::{CheckoutOutcome, CheckoutReport};
use crate::domain::order::Order;
use crate::error::{CheckoutError, StatusClass};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Completed,
    /// Charged; the order will be recorded by a retry or by reconciliation.
    Processing,
    Declined,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl From<&CheckoutError> for ErrorBody {
    fn from(error: &CheckoutError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

/// What the storefront client gets back for one checkout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub status: ResponseStatus,
    pub http_status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_id: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub replayed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub warnings: Vec<String>,
}

impl CheckoutResponse {
    /// A request rejected before the workflow started.
    pub fn from_error(error: &CheckoutError) -> Self {
        let status = match error.status_class() {
            StatusClass::PaymentRefused => ResponseStatus::Declined,
            _ => ResponseStatus::Error,
        };
        Self {
            status,
            http_status: error.http_status(),
            idempotency_key: None,
            order: None,
            charge_id: None,
            replayed: false,
            error: Some(error.into()),
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: impl IntoIterator<Item = String>) -> Self {
        self.warnings.extend(warnings);
        self
    }
}

impl From<&CheckoutReport> for CheckoutResponse {
    fn from(report: &CheckoutReport) -> Self {
        let mut response = match &report.outcome {
            CheckoutOutcome::Completed { order, replayed } => Self {
                status: ResponseStatus::Completed,
                http_status: 200,
                idempotency_key: None,
                charge_id: Some(order.charge_id.0.clone()),
                order: Some(order.clone()),
                replayed: *replayed,
                error: None,
                warnings: Vec::new(),
            },
            CheckoutOutcome::Failed { error, .. } => Self::from_error(error),
            CheckoutOutcome::ChargedButUnrecorded { receipt, error } => Self {
                status: ResponseStatus::Processing,
                http_status: 202,
                idempotency_key: None,
                order: None,
                charge_id: Some(receipt.charge_id.0.clone()),
                replayed: false,
                error: Some(error.into()),
                warnings: Vec::new(),
            },
        };
        response.idempotency_key = Some(report.key.to_string());
        response.with_warnings(report.warnings.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::checkout::CheckoutState;
    use crate::domain::customer::CustomerId;
    use crate::domain::intent::IdempotencyKey;
    use crate::domain::money::{Amount, Currency};
    use crate::domain::payment::{ChargeId, ChargeReceipt};

    fn report(outcome: CheckoutOutcome) -> CheckoutReport {
        CheckoutReport {
            key: IdempotencyKey::new("k1").unwrap(),
            outcome,
            trail: vec![CheckoutState::Start],
            warnings: vec!["card not remembered".to_string()],
        }
    }

    #[test]
    fn test_unrecorded_charge_is_processing() {
        let response = CheckoutResponse::from(&report(CheckoutOutcome::ChargedButUnrecorded {
            receipt: ChargeReceipt {
                charge_id: ChargeId("ch_1".to_string()),
                amount: Amount::new(1999).unwrap(),
                currency: Currency::usd(),
            },
            error: CheckoutError::OrderPersistFailure("disk full".to_string()),
        }));

        assert_eq!(response.status, ResponseStatus::Processing);
        assert_eq!(response.http_status, 202);
        assert_eq!(response.charge_id.as_deref(), Some("ch_1"));
        assert_eq!(response.idempotency_key.as_deref(), Some("k1"));
        assert_eq!(response.warnings, vec!["card not remembered".to_string()]);
    }

    #[test]
    fn test_status_categories() {
        let declined = CheckoutResponse::from_error(&CheckoutError::ChargeDeclined("no".into()));
        assert_eq!(declined.status, ResponseStatus::Declined);
        assert_eq!(declined.http_status, 402);

        let missing =
            CheckoutResponse::from_error(&CheckoutError::NoStoredPaymentMethod(CustomerId(3)));
        assert_eq!(missing.status, ResponseStatus::Error);
        assert_eq!(missing.http_status, 422);

        let json = serde_json::to_value(&missing).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["httpStatus"], 422);
        assert_eq!(json["error"]["code"], "no_stored_payment_method");
        assert!(json.get("order").is_none());
    }
}
