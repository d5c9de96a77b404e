//! Metric declarations for the driver.
//!
//! Metrics are recorded through the `metrics` facade; they are no-ops until
//! the host installs a recorder. Call [`describe_metrics`] once at startup to
//! register descriptions.
//!
//! ```rust
//! use esplink_driver::metrics::metric_defs;
//!
//! assert_eq!(metric_defs::BEACONS_SENT.name, "esplink.beacon.sent");
//! ```

use metrics::{describe_counter, Unit};

/// A counter declaration with its metadata.
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "esplink.beacon.sent").
    pub name: &'static str,
    /// Human-readable description of the metric.
    pub description: &'static str,
    /// The unit of measurement.
    pub unit: Unit,
}

impl Metric {
    /// Creates a counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self {
            name,
            description: "",
            unit: Unit::Count,
        }
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    /// Registers this metric's description with the metrics recorder.
    pub fn describe(&self) {
        describe_counter!(self.name, self.unit, self.description);
    }

    /// Increments the counter by one.
    pub fn increment(&self) {
        metrics::counter!(self.name).increment(1);
    }

    /// Increments the counter by `value`.
    pub fn add(&self, value: u64) {
        metrics::counter!(self.name).increment(value);
    }
}

/// All metrics recorded by the driver.
pub mod metric_defs {
    use super::Metric;
    use metrics::Unit;

    /// Beacons confirmed sent.
    pub const BEACONS_SENT: Metric =
        Metric::counter("esplink.beacon.sent").with_description("Beacons confirmed with SEND OK");

    /// Beacon attempts that failed.
    pub const BEACON_FAILURES: Metric = Metric::counter("esplink.beacon.failures")
        .with_description("Beacon attempts without SEND OK");

    /// Payloads confirmed sent.
    pub const PAYLOADS_SENT: Metric =
        Metric::counter("esplink.send.ok").with_description("Payloads confirmed with SEND OK");

    /// Payload bytes confirmed sent.
    pub const PAYLOAD_BYTES_SENT: Metric = Metric::counter("esplink.send.bytes")
        .with_description("Payload bytes confirmed with SEND OK")
        .with_unit(Unit::Bytes);

    /// Sends that failed or were rejected.
    pub const SEND_FAILURES: Metric = Metric::counter("esplink.send.failures")
        .with_description("Sends rejected by the send guard or not confirmed");

    /// Inbound data notifications.
    pub const PACKETS_RECEIVED: Metric =
        Metric::counter("esplink.rx.packets").with_description("+IPD notifications classified");

    /// `Link` notifications.
    pub const LINK_EVENTS: Metric =
        Metric::counter("esplink.rx.link").with_description("Link notifications classified");

    /// Lines dropped for overflowing the receive buffer or failing to parse.
    pub const LINES_DROPPED: Metric = Metric::counter("esplink.rx.dropped")
        .with_description("Inbound lines dropped as oversized or malformed");

    /// Hardware resets requested by the liveness loop.
    pub const HARD_RESETS: Metric = Metric::counter("esplink.watchdog.resets")
        .with_description("Hardware resets requested after missed beacons");

    /// Every metric, for registration.
    pub const ALL: &[Metric] = &[
        BEACONS_SENT,
        BEACON_FAILURES,
        PAYLOADS_SENT,
        PAYLOAD_BYTES_SENT,
        SEND_FAILURES,
        PACKETS_RECEIVED,
        LINK_EVENTS,
        LINES_DROPPED,
        HARD_RESETS,
    ];
}

/// Register descriptions for every driver metric.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
