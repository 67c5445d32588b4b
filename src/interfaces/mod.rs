//! Adapters between the outside world and the checkout workflow.

pub mod csv;
pub mod json;
