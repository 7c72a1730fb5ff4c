//! Dedup gate metrics for observability

use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<DedupMetricsInner> = OnceLock::new();

struct DedupMetricsInner {
    decisions: CounterVec,
    store_errors: CounterVec,
    store_latency: HistogramVec,
}

impl DedupMetricsInner {
    fn new() -> Self {
        Self {
            decisions: CounterVec::new(
                Opts::new(
                    "event_dedup_decisions_total",
                    "Total dedup decisions by outcome",
                ),
                &["event_type", "outcome"],
            )
            .expect("valid metric definition"),
            store_errors: CounterVec::new(
                Opts::new(
                    "event_dedup_store_errors_total",
                    "Total seen-store failures",
                ),
                &["operation", "error_type"],
            )
            .expect("valid metric definition"),
            store_latency: HistogramVec::new(
                HistogramOpts::new(
                    "event_dedup_store_latency_seconds",
                    "Seen-store command latency",
                )
                .buckets(vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5]),
                &["operation"],
            )
            .expect("valid metric definition"),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.decisions.clone()))?;
        registry.register(Box::new(self.store_errors.clone()))?;
        registry.register(Box::new(self.store_latency.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static DedupMetricsInner {
    METRICS.get_or_init(DedupMetricsInner::new)
}

/// Dedup metrics wrapper
#[derive(Clone, Copy, Debug, Default)]
pub struct DedupMetrics;

impl DedupMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        get_metrics().register(registry)
    }

    pub fn record_decision(&self, event_type: &str, outcome: &str) {
        get_metrics()
            .decisions
            .with_label_values(&[event_type, outcome])
            .inc();
    }

    pub fn record_store_error(&self, operation: &str, error_type: &str) {
        get_metrics()
            .store_errors
            .with_label_values(&[operation, error_type])
            .inc();
    }

    pub fn observe_store_latency(&self, operation: &str, seconds: f64) {
        get_metrics()
            .store_latency
            .with_label_values(&[operation])
            .observe(seconds);
    }
}
