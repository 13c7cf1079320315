// Prometheus metrics definitions for SqueakBot.

use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Gauges ───────────────────────────────────────────────────────

    /// Traps currently armed across all locations.
    pub static ref ACTIVE_TRAPS: IntGauge =
        IntGauge::new("squeakbot_active_traps", "Traps currently armed").unwrap();

    /// Users with a ledger record.
    pub static ref KNOWN_USERS: IntGauge =
        IntGauge::new("squeakbot_known_users", "Users with a ledger record").unwrap();

    // ── Counters ─────────────────────────────────────────────────────

    /// Squeaks that earned a point.
    pub static ref SQUEAKS_SCORED_TOTAL: IntCounter = IntCounter::new(
        "squeakbot_squeaks_scored_total",
        "Squeaks that earned a point",
    )
    .unwrap();

    /// Events rejected by a cooldown, by kind (squeak or command name).
    pub static ref RATE_LIMITED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("squeakbot_rate_limited_total", "Events rejected by a cooldown"),
        &["kind"],
    )
    .unwrap();

    /// Commands handled, by command name.
    pub static ref COMMANDS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("squeakbot_commands_total", "Commands handled"),
        &["command"],
    )
    .unwrap();

    /// Traps set.
    pub static ref TRAPS_SET_TOTAL: IntCounter =
        IntCounter::new("squeakbot_traps_set_total", "Traps set").unwrap();

    /// Traps that caught a squeaker.
    pub static ref TRAPS_TRIGGERED_TOTAL: IntCounter =
        IntCounter::new("squeakbot_traps_triggered_total", "Traps that caught a squeaker").unwrap();

    /// Traps removed by expiry.
    pub static ref TRAPS_EXPIRED_TOTAL: IntCounter =
        IntCounter::new("squeakbot_traps_expired_total", "Traps removed by expiry").unwrap();

    /// Disarm attempts, by outcome (failed, mishap, clean).
    pub static ref DISARMS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("squeakbot_disarms_total", "Disarm attempts by outcome"),
        &["outcome"],
    )
    .unwrap();

    /// Ledger flushes that failed or timed out.
    pub static ref PERSIST_FAILURES_TOTAL: IntCounter = IntCounter::new(
        "squeakbot_persist_failures_total",
        "Ledger flushes that failed or timed out",
    )
    .unwrap();

    /// Events whose handling panicked.
    pub static ref EVENT_PANICS_TOTAL: IntCounter =
        IntCounter::new("squeakbot_event_panics_total", "Events whose handling panicked").unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// Ledger flush time in seconds.
    pub static ref PERSIST_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new("squeakbot_persist_duration_seconds", "Ledger flush time in seconds")
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
    )
    .unwrap();
}

static REGISTER: Once = Once::new();

/// Register all metrics with the custom registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(ACTIVE_TRAPS.clone()),
            Box::new(KNOWN_USERS.clone()),
            Box::new(SQUEAKS_SCORED_TOTAL.clone()),
            Box::new(RATE_LIMITED_TOTAL.clone()),
            Box::new(COMMANDS_TOTAL.clone()),
            Box::new(TRAPS_SET_TOTAL.clone()),
            Box::new(TRAPS_TRIGGERED_TOTAL.clone()),
            Box::new(TRAPS_EXPIRED_TOTAL.clone()),
            Box::new(DISARMS_TOTAL.clone()),
            Box::new(PERSIST_FAILURES_TOTAL.clone()),
            Box::new(EVENT_PANICS_TOTAL.clone()),
            Box::new(PERSIST_DURATION_SECONDS.clone()),
        ];

        for c in collectors {
            if let Err(e) = REGISTRY.register(c) {
                tracing::warn!("Failed to register metric: {e}");
            }
        }
    });
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
