//! Ambient Prometheus metrics, exposed at `GET /metrics` on both tiers.

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::registry::Registry;

pub struct Metrics {
    registry: Registry,
    pub cloudlet_registrations: Counter,
    pub cloudlet_expirations: Counter,
    pub dispatch_attempts: Counter,
    pub dispatch_successes: Counter,
    pub dispatch_failures: Counter,
    pub carbon_reports_served: Counter,
    pub broadcast_ticks: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let cloudlet_registrations = Counter::default();
        registry.register(
            "cloudlet_registrations",
            "Cloudlet report upserts accepted",
            cloudlet_registrations.clone(),
        );

        let cloudlet_expirations = Counter::default();
        registry.register(
            "cloudlet_expirations",
            "Cloudlets removed by the TTL expiry sweep",
            cloudlet_expirations.clone(),
        );

        let dispatch_attempts = Counter::default();
        registry.register(
            "dispatch_attempts",
            "Per-candidate deploy calls attempted",
            dispatch_attempts.clone(),
        );

        let dispatch_successes = Counter::default();
        registry.register(
            "dispatch_successes",
            "Per-candidate deploy calls that returned a descriptor",
            dispatch_successes.clone(),
        );

        let dispatch_failures = Counter::default();
        registry.register(
            "dispatch_failures",
            "Per-candidate deploy calls that errored or returned nothing",
            dispatch_failures.clone(),
        );

        let carbon_reports_served = Counter::default();
        registry.register(
            "carbon_reports_served",
            "Carbon reports computed and merged into a resource report",
            carbon_reports_served.clone(),
        );

        let broadcast_ticks = Counter::default();
        registry.register(
            "broadcast_ticks",
            "Experiment timestamp broadcast ticks completed",
            broadcast_ticks.clone(),
        );

        Self {
            registry,
            cloudlet_registrations,
            cloudlet_expirations,
            dispatch_attempts,
            dispatch_successes,
            dispatch_failures,
            carbon_reports_served,
            broadcast_ticks,
        }
    }

    pub fn render(&self) -> String {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry).unwrap_or_default();
        buffer
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
