use super::recorder::OrderRecorder;
use crate::domain::intent::{ChargeIntent, IdempotencyKey, IntentStatus};
use crate::domain::order::OrderId;
use crate::domain::ports::{IntentStoreRef, OrderStoreRef};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, warn};

/// What one reconciliation pass did.
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct ReconcileReport {
    /// Orders written for charges that had none.
    pub recovered: Vec<OrderId>,
    /// Charged intents whose order still could not be written.
    pub still_failing: Vec<IdempotencyKey>,
    /// Intents an operator has to settle with the gateway by hand.
    pub needs_review: Vec<IdempotencyKey>,
}

/// Out-of-band completion of checkouts where money moved but records did not.
///
/// Never charges and never refunds: charged intents get their missing order,
/// anything whose charge outcome is not known is only reported.
pub struct Reconciler {
    intents: IntentStoreRef,
    recorder: OrderRecorder,
    stale_after: Duration,
}

impl Reconciler {
    /// `stale_after` keeps the pass away from checkouts that are still running.
    pub fn new(intents: IntentStoreRef, orders: OrderStoreRef, stale_after: Duration) -> Self {
        Self {
            intents,
            recorder: OrderRecorder::new(orders),
            stale_after,
        }
    }

    pub async fn run_once(&self) -> Result<ReconcileReport> {
        let now = Utc::now();
        let mut report = ReconcileReport::default();

        for intent in self.intents.list_by_status(IntentStatus::Charged).await? {
            if self.is_stale(&intent, now) {
                self.complete(intent, &mut report).await;
            }
        }

        for intent in self.intents.list_by_status(IntentStatus::Pending).await? {
            if self.is_stale(&intent, now) {
                warn!(key = %intent.key, "checkout stuck before charge confirmation");
                report.needs_review.push(intent.key);
            }
        }

        for intent in self.intents.list_by_status(IntentStatus::Unknown).await? {
            warn!(key = %intent.key, failure = ?intent.failure, "charge outcome unknown");
            report.needs_review.push(intent.key);
        }

        info!(
            recovered = report.recovered.len(),
            still_failing = report.still_failing.len(),
            needs_review = report.needs_review.len(),
            "reconciliation pass finished"
        );
        Ok(report)
    }

    async fn complete(&self, mut intent: ChargeIntent, report: &mut ReconcileReport) {
        let Some(receipt) = intent.receipt() else {
            report.needs_review.push(intent.key);
            return;
        };

        match self.recorder.record(receipt, &intent.order).await {
            Ok(order) => {
                info!(key = %intent.key, order_id = %order.id, "recovered unrecorded order");
                intent.mark_recorded(order.id);
                report.recovered.push(order.id);
                if let Err(e) = self.intents.store(intent).await {
                    // Recording is idempotent per charge; the next pass closes it.
                    warn!(error = %e, "order recovered but intent not updated");
                }
            }
            Err(e) => {
                error!(key = %intent.key, error = %e, "order still cannot be recorded");
                report.still_failing.push(intent.key.clone());
                intent.note_record_failure(e.to_string());
                if let Err(e) = self.intents.store(intent).await {
                    warn!(error = %e, "failed to update charge intent");
                }
            }
        }
    }

    fn is_stale(&self, intent: &ChargeIntent, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(intent.updated_at)
            .to_std()
            .is_ok_and(|age| age >= self.stale_after)
    }
}
