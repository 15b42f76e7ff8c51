//! Prometheus metrics for the command bridge
//!
//! Metrics are off until [`init_metrics`] runs. Hot paths go through
//! [`bridge_metrics`], which is a single atomic load when disabled.
//!
//! Exported:
//! - `drawbridge_commands_sent_total`
//! - `drawbridge_commands_completed_total{outcome}`
//! - `drawbridge_unmatched_responses_total`
//! - `drawbridge_connections_attached_total`
//! - `drawbridge_connections_replaced_total`
//! - `drawbridge_attach_contention_total`
//! - `drawbridge_pending_requests`
//! - `drawbridge_command_latency_seconds`

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, OnceLock};
use std::time::Duration;

/// Registry holding every Drawbridge metric
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static METRICS: OnceLock<BridgeMetrics> = OnceLock::new();

/// How a command left the pending table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    Failure,
    Timeout,
    Disconnected,
}

impl CommandOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandOutcome::Success => "success",
            CommandOutcome::Failure => "failure",
            CommandOutcome::Timeout => "timeout",
            CommandOutcome::Disconnected => "disconnected",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BridgeMetrics {
    commands_sent: IntCounter,
    commands_completed: IntCounterVec,
    unmatched_responses: IntCounter,
    connections_attached: IntCounter,
    connections_replaced: IntCounter,
    attach_contention: IntCounter,
    pending_requests: IntGauge,
    command_latency: Histogram,
}

impl BridgeMetrics {
    fn register(registry: &Registry) -> Self {
        let commands_sent = IntCounter::new(
            "drawbridge_commands_sent_total",
            "Commands transmitted to the remote-control client",
        )
        .expect("valid metric");
        let commands_completed = IntCounterVec::new(
            Opts::new(
                "drawbridge_commands_completed_total",
                "Commands removed from the pending table, by outcome",
            ),
            &["outcome"],
        )
        .expect("valid metric");
        let unmatched_responses = IntCounter::new(
            "drawbridge_unmatched_responses_total",
            "Responses whose id matched no pending command",
        )
        .expect("valid metric");
        let connections_attached = IntCounter::new(
            "drawbridge_connections_attached_total",
            "Connections installed in the bridge slot",
        )
        .expect("valid metric");
        let connections_replaced = IntCounter::new(
            "drawbridge_connections_replaced_total",
            "Connections closed because a newer one attached",
        )
        .expect("valid metric");
        let attach_contention = IntCounter::new(
            "drawbridge_attach_contention_total",
            "Attach attempts rejected after the bounded lock wait",
        )
        .expect("valid metric");
        let pending_requests = IntGauge::new(
            "drawbridge_pending_requests",
            "Commands currently awaiting a response",
        )
        .expect("valid metric");
        let command_latency = Histogram::with_opts(
            HistogramOpts::new(
                "drawbridge_command_latency_seconds",
                "Time from send to response for completed commands",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ]),
        )
        .expect("valid metric");

        registry.register(Box::new(commands_sent.clone())).expect("register");
        registry.register(Box::new(commands_completed.clone())).expect("register");
        registry.register(Box::new(unmatched_responses.clone())).expect("register");
        registry.register(Box::new(connections_attached.clone())).expect("register");
        registry.register(Box::new(connections_replaced.clone())).expect("register");
        registry.register(Box::new(attach_contention.clone())).expect("register");
        registry.register(Box::new(pending_requests.clone())).expect("register");
        registry.register(Box::new(command_latency.clone())).expect("register");

        Self {
            commands_sent,
            commands_completed,
            unmatched_responses,
            connections_attached,
            connections_replaced,
            attach_contention,
            pending_requests,
            command_latency,
        }
    }

    pub fn record_sent(&self) {
        self.commands_sent.inc();
        self.pending_requests.inc();
    }

    /// Record a command leaving the pending table.
    pub fn record_completed(&self, outcome: CommandOutcome, elapsed: Duration) {
        self.commands_completed
            .with_label_values(&[outcome.as_str()])
            .inc();
        self.pending_requests.dec();
        if matches!(outcome, CommandOutcome::Success | CommandOutcome::Failure) {
            self.command_latency.observe(elapsed.as_secs_f64());
        }
    }

    pub fn record_unmatched(&self) {
        self.unmatched_responses.inc();
    }

    pub fn record_attached(&self) {
        self.connections_attached.inc();
    }

    pub fn record_replaced(&self) {
        self.connections_replaced.inc();
    }

    pub fn record_attach_contention(&self) {
        self.attach_contention.inc();
    }
}

/// Register the metrics with [`REGISTRY`]. Idempotent.
pub fn init_metrics() {
    METRICS.get_or_init(|| BridgeMetrics::register(&REGISTRY));
}

pub fn metrics_enabled() -> bool {
    METRICS.get().is_some()
}

/// The bridge metrics, or `None` while metrics are disabled
#[inline]
pub fn bridge_metrics() -> Option<&'static BridgeMetrics> {
    METRICS.get()
}

/// Render all registered metrics in the Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
