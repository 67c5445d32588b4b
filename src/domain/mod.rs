//! Domain types and the ports the checkout workflow consumes.

pub mod checkout;
pub mod customer;
pub mod intent;
pub mod money;
pub mod order;
pub mod payment;
pub mod ports;
