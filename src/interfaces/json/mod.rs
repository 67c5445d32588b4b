//! JSON wire format of the checkout endpoint.

pub mod request;
pub mod request_reader;
pub mod response;

use crate::application::orchestrator::CheckoutOrchestrator;
use crate::config::CheckoutConfig;
use request::CheckoutPayload;
use response::CheckoutResponse;

/// Validates a wire request, runs it, and shapes the result for the client.
pub async fn handle_checkout(
    orchestrator: &CheckoutOrchestrator,
    payload: CheckoutPayload,
    config: &CheckoutConfig,
) -> CheckoutResponse {
    let validated = match payload.validate(&config.default_currency) {
        Ok(validated) => validated,
        Err(e) => return CheckoutResponse::from_error(&e),
    };

    let report = orchestrator.checkout(validated.request).await;
    let mut response = CheckoutResponse::from(&report);
    let mut warnings = validated.warnings;
    warnings.append(&mut response.warnings);
    response.warnings = warnings;
    response
}
