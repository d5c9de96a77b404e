//! The polling loop: inbound traffic, discovery beacons, and liveness.
//!
//! [`EspWifi::run`] is called repeatedly from the host's main loop. Between
//! beacons it only processes input that is already buffered and returns. Once
//! the beacon interval has elapsed it sends a beacon instead, retrying on every
//! call until one is confirmed.
//!
//! Once the interval has elapsed with beacons disabled, `run` does nothing at
//! all until beacons are enabled again: no input is read and the watchdog is
//! not pulsed.
//!
//! With the watchdog enabled each call also pulses the hardware watchdog,
//! unless beacons have failed for longer than
//! [`reset_threshold_ms`](crate::DriverConfig::reset_threshold_ms). In that case
//! the link is considered dead: the driver requests a hardware reset and
//! stops making progress.

use esplink_at_protocol::Beacon;
use tracing::{debug, error, warn};

use crate::classifier::InputSummary;
use crate::driver::EspWifi;
use crate::error::{WifiError, WifiResult};
use crate::metrics::metric_defs;
use crate::transport::{EventHandler, Transport, Watchdog};

/// What a call to [`EspWifi::run`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Available input was processed.
    Received(InputSummary),
    /// A beacon was sent and confirmed.
    BeaconSent,
    /// A beacon was attempted and not confirmed; it is retried next call.
    BeaconFailed,
    /// Beacons have failed for too long; a hardware reset was requested.
    HardResetRequested,
    /// The beacon interval has elapsed with beacons disabled; nothing was
    /// done, and the watchdog was not pulsed.
    Idle,
    /// A hardware reset was requested earlier; nothing was done.
    Halted,
}

impl<T: Transport, W: Watchdog, H: EventHandler> EspWifi<T, W, H> {
    /// Run one iteration of the polling loop.
    pub fn run(&mut self) -> PollOutcome {
        if self.state.halted {
            return PollOutcome::Halted;
        }

        let now = self.transport.now_millis();
        let elapsed = now.saturating_sub(self.state.beacon.last_success_ms);

        let outcome = if elapsed < self.state.beacon.interval_ms {
            PollOutcome::Received(self.process_input())
        } else if !self.state.beacon.enabled {
            return PollOutcome::Idle;
        } else {
            match self.send_beacon() {
                Ok(()) => {
                    self.state.beacon.last_success_ms = now;
                    metric_defs::BEACONS_SENT.increment();
                    PollOutcome::BeaconSent
                }
                Err(err) => {
                    warn!("BeaconLivenessLoop: beacon failed: {}", err);
                    metric_defs::BEACON_FAILURES.increment();
                    PollOutcome::BeaconFailed
                }
            }
        };

        if self.state.watchdog_enabled {
            let silent_for = now.saturating_sub(self.state.beacon.last_success_ms);
            if silent_for > self.config.reset_threshold_ms() {
                self.request_hard_reset(silent_for);
                return PollOutcome::HardResetRequested;
            }
            self.watchdog.pulse();
        }

        outcome
    }

    /// Send one beacon on the beacon channel.
    pub fn send_beacon(&mut self) -> WifiResult<()> {
        let identity = self.state.identity.ok_or(WifiError::AddressUnavailable)?;
        let payload = Beacon::new(identity.ip(), self.state.server_port, &self.state.beacon.device).encode();

        debug!(
            "BeaconLivenessLoop: beacon to {}:{} ({} bytes)",
            identity.broadcast(),
            self.config.beacon_port,
            payload.len()
        );
        self.send_on(self.config.beacon_channel, &payload)
    }

    fn request_hard_reset(&mut self, silent_for: u64) {
        error!(
            "BeaconLivenessLoop: no beacon confirmed for {} ms (limit {} ms), forcing reset",
            silent_for,
            self.config.reset_threshold_ms()
        );
        metric_defs::HARD_RESETS.increment();
        self.state.halted = true;
        self.watchdog.hard_reset();
    }
}
