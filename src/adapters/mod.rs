pub mod cors;
pub mod dispense_handler;
pub mod health_handler;
pub mod message;
pub mod metrics_handler;
pub mod rate_limit;
