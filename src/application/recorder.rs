use crate::domain::order::{NewOrder, Order, OrderDraft, OrderStatus};
use crate::domain::payment::ChargeReceipt;
use crate::domain::ports::OrderStoreRef;
use crate::error::{CheckoutError, Result};
use tracing::info;

/// Persists an order once, and only once, its charge is confirmed.
#[derive(Clone)]
pub struct OrderRecorder {
    orders: OrderStoreRef,
}

impl OrderRecorder {
    pub fn new(orders: OrderStoreRef) -> Self {
        Self { orders }
    }

    /// Requires the receipt by value: there is no way to call this before a
    /// charge has succeeded.
    ///
    /// Idempotent per charge: the store returns the order already written for
    /// `receipt.charge_id` instead of writing a second one.
    pub async fn record(&self, receipt: ChargeReceipt, draft: &OrderDraft) -> Result<Order> {
        let new = NewOrder {
            draft: draft.clone(),
            charge_id: receipt.charge_id,
            status: OrderStatus::Completed,
        };
        let order = self
            .orders
            .create_order(new)
            .await
            .map_err(|e| CheckoutError::OrderPersistFailure(e.to_string()))?;
        info!(order_id = %order.id, customer_id = %order.customer_id, "order recorded");
        Ok(order)
    }
}
