//! Application layer containing the checkout workflow.
//!
//! `CheckoutOrchestrator` is the entry point: it sequences the
//! `PaymentMethodResolver`, the `ChargeExecutor` and the `OrderRecorder`
//! against injected ports, and `Reconciler` finishes what a crashed or
//! partially failed checkout left behind.

pub mod charge;
pub mod orchestrator;
pub mod reconciler;
pub mod recorder;
pub mod resolver;

#[cfg(test)]
pub(crate) mod test_support;
