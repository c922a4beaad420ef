// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics. Without an installed recorder every call is a no-op.

use metrics::{describe_counter, describe_gauge, describe_histogram};

pub const INBOUND_MESSAGES: &str = "switchboard_inbound_messages_total";
pub const OUTBOUND_MESSAGES: &str = "switchboard_outbound_messages_total";
pub const ASSIGNMENTS: &str = "switchboard_assignments_total";
pub const GATEWAY_LATENCY: &str = "switchboard_gateway_latency_seconds";
pub const FANOUT_DROPPED: &str = "switchboard_fanout_dropped_total";
pub const LIVE_CONNECTIONS: &str = "switchboard_live_connections";

/// Register all Switchboard metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(INBOUND_MESSAGES, "Inbound customer messages by outcome");
    describe_counter!(OUTBOUND_MESSAGES, "Agent sends by outcome");
    describe_counter!(ASSIGNMENTS, "Conversation assignment attempts by outcome");
    describe_histogram!(
        GATEWAY_LATENCY,
        "Channel gateway send latency in seconds"
    );
    describe_counter!(
        FANOUT_DROPPED,
        "Fan-out events dropped because a subscriber queue was full"
    );
    describe_gauge!(LIVE_CONNECTIONS, "Live real-time subscriber connections");
}

/// Record an inbound message (`accepted`, `duplicate`, `rejected`).
pub fn record_inbound(outcome: &'static str) {
    metrics::counter!(INBOUND_MESSAGES, "outcome" => outcome).increment(1);
}

/// Record an outbound send (`sent`, `replayed`, `gateway_error`).
pub fn record_outbound(outcome: &'static str) {
    metrics::counter!(OUTBOUND_MESSAGES, "outcome" => outcome).increment(1);
}

/// Record an assignment attempt (`assigned`, `pending`).
pub fn record_assignment(outcome: &'static str) {
    metrics::counter!(ASSIGNMENTS, "outcome" => outcome).increment(1);
}

/// Record how long a channel gateway call took.
pub fn record_gateway_latency(seconds: f64) {
    metrics::histogram!(GATEWAY_LATENCY).record(seconds);
}

/// Record events dropped for slow subscribers.
pub fn record_fanout_dropped(count: u64) {
    if count > 0 {
        metrics::counter!(FANOUT_DROPPED).increment(count);
    }
}

/// Set the number of live subscriber connections.
pub fn set_live_connections(count: usize) {
    metrics::gauge!(LIVE_CONNECTIONS).set(count as f64);
}
