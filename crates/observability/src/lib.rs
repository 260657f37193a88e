use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    generation_calls_total: AtomicU64,
    classifier_fallback_total: AtomicU64,
    calculations_total: AtomicU64,
    apologies_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub generation_calls_total: u64,
    pub classifier_fallback_total: u64,
    pub calculations_total: u64,
    pub apologies_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_generation_call(&self) {
        self.generation_calls_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_classifier_fallback(&self) {
        self.classifier_fallback_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_calculations(&self, count: usize) {
        self.calculations_total
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn inc_apology(&self) {
        self.apologies_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: requests,
            generation_calls_total: self.generation_calls_total.load(Ordering::Relaxed),
            classifier_fallback_total: self.classifier_fallback_total.load(Ordering::Relaxed),
            calculations_total: self.calculations_total.load(Ordering::Relaxed),
            apologies_total: self.apologies_total.load(Ordering::Relaxed),
            avg_latency_millis: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,sage_api=info,sage_agents=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_averages_latency_over_requests() {
        let metrics = AppMetrics::default();
        metrics.inc_request();
        metrics.inc_request();
        metrics.observe_latency(Duration::from_millis(30));
        metrics.observe_latency(Duration::from_millis(10));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_total, 2);
        assert_eq!(snapshot.avg_latency_millis, 20.0);
    }
}
