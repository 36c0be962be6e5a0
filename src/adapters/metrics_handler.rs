use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::persistence::{PersistenceError, SharedTokenRepository};

pub const OUTCOME_DISPENSED: &str = "dispensed";
pub const OUTCOME_EMPTY: &str = "empty";

pub struct MetricsCollector {
    registry: Registry,

    // Dispense metrics
    pub dispense_total: IntCounterVec,
    pub dispense_duration: Histogram,

    // Pool metrics
    pub pool_remaining: IntGauge,
    pub rate_limited: IntCounter,
}

impl MetricsCollector {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let dispense_total = IntCounterVec::new(
            Opts::new("tokenpool_dispense_total", "Dispense attempts by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(dispense_total.clone()))?;

        // start every outcome at zero so dashboards see the series
        for outcome in [OUTCOME_DISPENSED, OUTCOME_EMPTY, "unavailable", "conflict"] {
            dispense_total.with_label_values(&[outcome]);
        }

        let dispense_duration = Histogram::with_opts(HistogramOpts::new(
            "tokenpool_dispense_duration_seconds",
            "Time spent in the dispense transaction, including lock wait",
        ))?;
        registry.register(Box::new(dispense_duration.clone()))?;

        let pool_remaining = IntGauge::new(
            "tokenpool_pool_remaining",
            "Tokens left in the pool at the last scrape",
        )?;
        registry.register(Box::new(pool_remaining.clone()))?;

        let rate_limited = IntCounter::new(
            "tokenpool_rate_limited_total",
            "Requests rejected by the rate limiter",
        )?;
        registry.register(Box::new(rate_limited.clone()))?;

        Ok(Self {
            registry,
            dispense_total,
            dispense_duration,
            pool_remaining,
            rate_limited,
        })
    }

    pub fn record_outcome(&self, outcome: &str) {
        self.dispense_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_error(&self, error: &PersistenceError) {
        self.record_outcome(error.kind());
    }

    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

pub struct MetricsHandler {
    collector: Arc<MetricsCollector>,
    repository: SharedTokenRepository,
}

impl MetricsHandler {
    pub fn new(collector: Arc<MetricsCollector>, repository: SharedTokenRepository) -> Self {
        Self {
            collector,
            repository,
        }
    }

    pub async fn metrics(&self) -> String {
        match self.repository.count().await {
            Ok(remaining) => self
                .collector
                .pool_remaining
                .set(i64::try_from(remaining).unwrap_or(i64::MAX)),
            Err(e) => tracing::warn!(error = %e, "Could not refresh pool size gauge"),
        }

        self.collector.encode().unwrap_or_else(|e| {
            tracing::error!("Failed to encode metrics: {}", e);
            String::from("# Error encoding metrics\n")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new();
        assert!(collector.is_ok());
    }

    #[test]
    fn test_outcomes_are_counted_by_label() {
        let collector = MetricsCollector::new().unwrap();
        collector.record_outcome(OUTCOME_DISPENSED);
        collector.record_outcome(OUTCOME_DISPENSED);
        collector.record_error(&PersistenceError::TransactionConflict("locked".to_string()));

        assert_eq!(collector.dispense_total.with_label_values(&[OUTCOME_DISPENSED]).get(), 2);
        assert_eq!(collector.dispense_total.with_label_values(&["conflict"]).get(), 1);
        assert_eq!(collector.dispense_total.with_label_values(&[OUTCOME_EMPTY]).get(), 0);
    }

    #[test]
    fn test_metrics_encoding() {
        let collector = MetricsCollector::new().unwrap();
        collector.rate_limited.inc();

        let metrics_text = collector.encode().unwrap();
        assert!(metrics_text.contains("tokenpool_dispense_total{outcome=\"empty\"} 0"));
        assert!(metrics_text.contains("tokenpool_rate_limited_total 1"));
        assert!(metrics_text.contains("tokenpool_pool_remaining"));
    }
}
