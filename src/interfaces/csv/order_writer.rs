use crate::domain::order::Order;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// Flat CSV row of an order; `purchase_date` is RFC 3339.
#[derive(Debug, Serialize)]
struct OrderRow<'a> {
    id: u64,
    customer_id: u64,
    product_id: u64,
    amount: i64,
    currency: &'a str,
    status: &'a str,
    charge_id: &'a str,
    purchase_date: String,
}

impl<'a> From<&'a Order> for OrderRow<'a> {
    fn from(order: &'a Order) -> Self {
        Self {
            id: order.id.0,
            customer_id: order.customer_id.0,
            product_id: order.product_id.0,
            amount: order.amount.minor_units(),
            currency: order.currency.as_str(),
            status: order.status.as_str(),
            charge_id: &order.charge_id.0,
            purchase_date: order.purchase_date.to_rfc3339(),
        }
    }
}

/// Writes order history as CSV.
pub struct OrderWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OrderWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes every order, header first even when there are none, and flushes.
    pub fn write_orders<'a>(&mut self, orders: impl IntoIterator<Item = &'a Order>) -> Result<()> {
        let mut wrote_any = false;
        for order in orders {
            self.writer.serialize(OrderRow::from(order))?;
            wrote_any = true;
        }
        if !wrote_any {
            self.writer.write_record([
                "id",
                "customer_id",
                "product_id",
                "amount",
                "currency",
                "status",
                "charge_id",
                "purchase_date",
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
