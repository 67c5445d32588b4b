use super::charge::ChargeExecutor;
use super::recorder::OrderRecorder;
use super::resolver::PaymentMethodResolver;
use crate::config::CheckoutConfig;
use crate::domain::checkout::{CheckoutOutcome, CheckoutReport, CheckoutRequest, CheckoutState};
use crate::domain::intent::{ChargeIntent, Claim, IdempotencyKey, IntentStatus};
use crate::domain::order::{Order, OrderDraft};
use crate::domain::payment::ChargeReceipt;
use crate::domain::ports::{GatewayRef, IntentStoreRef, OrderStoreRef, VaultRef};
use crate::error::CheckoutError;
use tracing::{Instrument, debug, error, info_span, warn};

/// The collaborators a checkout runs against.
#[derive(Clone)]
pub struct Ports {
    pub vault: VaultRef,
    pub orders: OrderStoreRef,
    pub intents: IntentStoreRef,
    pub gateway: GatewayRef,
}

/// Tracks the state machine of a single checkout.
struct Workflow {
    key: IdempotencyKey,
    state: CheckoutState,
    trail: Vec<CheckoutState>,
    warnings: Vec<String>,
}

impl Workflow {
    fn new(key: IdempotencyKey) -> Self {
        Self {
            key,
            state: CheckoutState::Start,
            trail: vec![CheckoutState::Start],
            warnings: Vec::new(),
        }
    }

    fn advance(&mut self, next: CheckoutState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal checkout transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(from = ?self.state, to = ?next, "checkout transition");
        self.state = next;
        self.trail.push(next);
    }

    fn finish(self, outcome: CheckoutOutcome) -> CheckoutReport {
        CheckoutReport {
            key: self.key,
            outcome,
            trail: self.trail,
            warnings: self.warnings,
        }
    }

    fn completed(mut self, order: Order, replayed: bool) -> CheckoutReport {
        self.advance(CheckoutState::Completed);
        self.finish(CheckoutOutcome::Completed { order, replayed })
    }

    fn failed(mut self, error: CheckoutError) -> CheckoutReport {
        let at = self.state;
        self.advance(CheckoutState::Failed);
        self.finish(CheckoutOutcome::Failed { at, error })
    }

    fn unrecorded(mut self, receipt: ChargeReceipt, error: CheckoutError) -> CheckoutReport {
        self.advance(CheckoutState::ChargedButUnrecorded);
        self.finish(CheckoutOutcome::ChargedButUnrecorded { receipt, error })
    }
}

/// Sequences resolution, charging and order recording for one checkout.
///
/// A durable charge intent keyed by the idempotency key is written before the
/// gateway is called, so a retried or interrupted checkout never charges twice
/// and a charge whose order could not be written is left for reconciliation.
#[derive(Clone)]
pub struct CheckoutOrchestrator {
    resolver: PaymentMethodResolver,
    executor: ChargeExecutor,
    recorder: OrderRecorder,
    intents: IntentStoreRef,
    description: String,
}

impl CheckoutOrchestrator {
    pub fn new(ports: Ports, config: &CheckoutConfig) -> Self {
        Self {
            resolver: PaymentMethodResolver::new(
                ports.vault,
                ports.gateway.clone(),
                config.gateway_timeout,
            ),
            executor: ChargeExecutor::new(ports.gateway, config.gateway_timeout),
            recorder: OrderRecorder::new(ports.orders),
            intents: ports.intents,
            description: config.description.clone(),
        }
    }

    /// Runs a checkout to a terminal state.
    ///
    /// The workflow runs on its own task: dropping the returned future (a
    /// disconnected client) does not stop it, so a confirmed charge is always
    /// followed by an attempt to record the order.
    pub async fn checkout(&self, request: CheckoutRequest) -> CheckoutReport {
        let key = request
            .idempotency_key
            .clone()
            .unwrap_or_else(IdempotencyKey::generate);
        let span = info_span!("checkout", %key, customer_id = %request.customer_id());

        let this = self.clone();
        let task_key = key.clone();
        let task = tokio::spawn(async move { this.run(request, task_key).await }.instrument(span));

        match task.await {
            Ok(report) => report,
            Err(e) => {
                error!(%key, error = %e, "checkout task aborted; inspect the charge intent");
                Workflow::new(key).failed(CheckoutError::ChargeOutcomeUnknown(format!(
                    "checkout task aborted: {e}"
                )))
            }
        }
    }

    async fn run(&self, request: CheckoutRequest, key: IdempotencyKey) -> CheckoutReport {
        let mut flow = Workflow::new(key.clone());
        let fresh = ChargeIntent::pending(key.clone(), request.order.clone());

        let mut intent = match self.intents.try_begin(fresh).await {
            Ok(Claim::Started(intent)) => intent,
            Ok(Claim::Existing(existing)) => {
                return self.resume(flow, existing, &request.order).await;
            }
            Err(e) => return flow.failed(CheckoutError::IntentStoreUnavailable(e.to_string())),
        };

        flow.advance(CheckoutState::ResolvingMethod);
        let resolution = match self
            .resolver
            .resolve(request.customer_id(), &request.source)
            .await
        {
            Ok(resolution) => resolution,
            Err(e) => {
                intent.mark_failed(e.to_string());
                self.save_intent(intent).await;
                return flow.failed(e);
            }
        };

        flow.advance(CheckoutState::Charging);
        let charged = self
            .executor
            .execute(
                request.order.amount,
                &request.order.currency,
                &self.description,
                &resolution.reference,
                &intent.gateway_key(),
            )
            .await;
        let receipt = match charged {
            Ok(receipt) => receipt,
            Err(e) => {
                if matches!(e, CheckoutError::ChargeOutcomeUnknown(_)) {
                    error!(
                        %key,
                        error = %e,
                        "charge outcome unknown; manual reconciliation required"
                    );
                    intent.mark_unknown(e.to_string());
                } else {
                    intent.mark_failed(e.to_string());
                }
                self.save_intent(intent).await;
                return flow.failed(e);
            }
        };

        intent.mark_charged(receipt.charge_id.clone());
        self.save_intent(intent.clone()).await;

        if resolution.remember
            && let Some(warning) = self
                .resolver
                .remember(request.customer_id(), resolution.reference)
                .await
        {
            flow.warnings.push(warning);
        }

        flow.advance(CheckoutState::RecordingOrder);
        self.record(flow, intent, receipt, false).await
    }

    /// Handles a key that already has an intent from an earlier attempt.
    async fn resume(
        &self,
        flow: Workflow,
        existing: ChargeIntent,
        order: &OrderDraft,
    ) -> CheckoutReport {
        let key = existing.key.clone();
        if !existing.matches(order) {
            return flow.failed(CheckoutError::Validation(format!(
                "idempotency key {key} was already used for a different order"
            )));
        }

        match existing.status {
            IntentStatus::Charged | IntentStatus::Recorded => {
                let Some(receipt) = existing.receipt() else {
                    return flow.failed(CheckoutError::ChargeOutcomeUnknown(format!(
                        "intent {key} is charged but has no charge id"
                    )));
                };
                debug!(%key, status = ?existing.status, "resuming charged checkout");
                let replayed = existing.status == IntentStatus::Recorded;
                let mut flow = flow;
                flow.advance(CheckoutState::RecordingOrder);
                self.record(flow, existing, receipt, replayed).await
            }
            IntentStatus::Unknown => flow.failed(CheckoutError::ChargeOutcomeUnknown(
                existing
                    .failure
                    .unwrap_or_else(|| "previous attempt ended ambiguously".to_string()),
            )),
            IntentStatus::Pending | IntentStatus::Failed => {
                flow.failed(CheckoutError::CheckoutInProgress(key))
            }
        }
    }

    async fn record(
        &self,
        flow: Workflow,
        mut intent: ChargeIntent,
        receipt: ChargeReceipt,
        replayed: bool,
    ) -> CheckoutReport {
        match self.recorder.record(receipt.clone(), &intent.order).await {
            Ok(order) => {
                if intent.status != IntentStatus::Recorded {
                    intent.mark_recorded(order.id);
                    self.save_intent(intent).await;
                }
                flow.completed(order, replayed)
            }
            Err(e) => {
                error!(
                    key = %intent.key,
                    charge_id = %receipt.charge_id,
                    error = %e,
                    "charged but order not recorded; reconciliation required"
                );
                intent.note_record_failure(e.to_string());
                self.save_intent(intent).await;
                flow.unrecorded(receipt, e)
            }
        }
    }

    async fn save_intent(&self, intent: ChargeIntent) {
        let key = intent.key.clone();
        let status = intent.status;
        if let Err(e) = self.intents.store(intent).await {
            // The gateway deduplicates on the key and order recording is
            // idempotent per charge, so a stale intent only delays reconciliation.
            if status == IntentStatus::Charged {
                error!(%key, error = %e, "charge not persisted to its intent");
            } else {
                warn!(%key, ?status, error = %e, "failed to update charge intent");
            }
        }
    }
}
