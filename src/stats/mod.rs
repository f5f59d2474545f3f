//! Delivery statistics

pub mod metrics;

pub use metrics::{DeliveryCounters, ManagerStats};
