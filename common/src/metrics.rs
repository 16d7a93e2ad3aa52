//! Open Metrics counters for the per-test metric bundle every worker fleet
//! reports, registered into a process-wide `prometheus_client::Registry`
//! the way the teacher's `telemetry::metrics::Metrics` registers its
//! `Family`-backed counters (`crates/agentgateway/src/telemetry/metrics.rs`).

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;
use serde::Serialize;

#[derive(Clone, Hash, Default, Debug, PartialEq, Eq, EncodeLabelSet)]
pub struct TestLabel {
    pub test_id: String,
}

/// Four monotone counters every protocol worker keeps per test, plus the
/// elapsed-time derivation every method needs for throughput/success-rate
/// reporting. Each counter is a handle into a `MetricsRegistry` family, so
/// incrementing it here is also what `/metrics` serves.
#[derive(Debug, Default)]
pub struct Metrics {
    pub events_sent: Counter,
    pub bytes_sent: Counter,
    pub successes: Counter,
    pub failures: Counter,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub events_sent: u64,
    pub bytes_sent: u64,
    pub successes: u64,
    pub failures: u64,
    pub throughput: f64,
    pub success_rate: f64,
}

impl Metrics {
    /// `throughput = sent / max(0.1, elapsed)`, `success_rate = successful /
    /// max(1, sent) * 100` — both guarded against a zero-elapsed or
    /// zero-sent divide, per the platform's metrics-race design note.
    pub fn snapshot(&self, elapsed_secs: f64) -> MetricsSnapshot {
        let sent = self.events_sent.get();
        let successes = self.successes.get();
        let throughput = sent as f64 / elapsed_secs.max(0.1);
        let success_rate = successes as f64 / (sent.max(1) as f64) * 100.0;
        MetricsSnapshot {
            events_sent: sent,
            bytes_sent: self.bytes_sent.get(),
            successes,
            failures: self.failures.get(),
            throughput,
            success_rate,
        }
    }
}

/// A worker process's metrics surface: one `Family<TestLabel, Counter>` per
/// kind, registered once at startup. `for_test` hands out the per-test
/// counter handles a `WorkerCtx` carries; `encode` is what `GET /metrics`
/// serves, mirroring the teacher's `metrics::App::router`'s `/metrics`
/// route (`src/metrics.rs`).
pub struct MetricsRegistry {
    registry: Registry,
    events_sent: Family<TestLabel, Counter>,
    bytes_sent: Family<TestLabel, Counter>,
    successes: Family<TestLabel, Counter>,
    failures: Family<TestLabel, Counter>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let mut build = |name: &str, help: &str| {
            let family = Family::default();
            registry.register(name, help, family.clone());
            family
        };
        let events_sent = build("events_sent", "Load-generation events sent");
        let bytes_sent = build("bytes_sent", "Bytes sent");
        let successes = build("successes", "Successful events");
        let failures = build("failures", "Failed events");
        Self {
            registry,
            events_sent,
            bytes_sent,
            successes,
            failures,
        }
    }

    pub fn for_test(&self, test_id: &str) -> Metrics {
        let label = TestLabel {
            test_id: test_id.to_string(),
        };
        Metrics {
            events_sent: self.events_sent.get_or_create(&label).clone(),
            bytes_sent: self.bytes_sent.get_or_create(&label).clone(),
            successes: self.successes.get_or_create(&label).clone(),
            failures: self.failures.get_or_create(&label).clone(),
        }
    }

    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry).expect("encoding metrics registry cannot fail");
        buffer
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throughput_guards_zero_elapsed() {
        let registry = MetricsRegistry::new();
        let m = registry.for_test("t1");
        m.events_sent.inc_by(5);
        let snap = m.snapshot(0.0);
        assert!(snap.throughput.is_finite());
        assert_eq!(snap.throughput, 5.0 / 0.1);
    }

    #[test]
    fn success_rate_guards_zero_sent() {
        let registry = MetricsRegistry::new();
        let m = registry.for_test("t2");
        let snap = m.snapshot(1.0);
        assert_eq!(snap.success_rate, 0.0);
    }

    #[test]
    fn counters_are_visible_on_the_registry_by_test_label() {
        let registry = MetricsRegistry::new();
        let m = registry.for_test("t3");
        m.events_sent.inc();
        let text = registry.encode();
        assert!(text.contains("events_sent_total{test_id=\"t3\"} 1"));
    }
}
