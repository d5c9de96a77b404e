//! The driver object.

use std::net::Ipv4Addr;

use esplink_at_protocol::LineAssembler;
use tracing::debug;

use crate::config::DriverConfig;
use crate::error::WifiResult;
use crate::state::{BeaconState, LinkState, NetworkIdentity, OperatingRole, SessionState};
use crate::transport::{EventHandler, NoWatchdog, Transport, Watchdog};

/// Driver for an AT-command WiFi co-processor.
///
/// Owns the serial transport, the watchdog, the application's event handler
/// and all session state. Setup goes through the session methods
/// ([`initialize`](Self::initialize), [`connect_wifi`](Self::connect_wifi),
/// [`start_server`](Self::start_server), ...); afterwards the host calls
/// [`run`](Self::run) from its main loop.
pub struct EspWifi<T, W = NoWatchdog, H = ()> {
    pub(crate) transport: T,
    pub(crate) watchdog: W,
    pub(crate) handler: H,
    pub(crate) config: DriverConfig,
    pub(crate) state: SessionState,
    pub(crate) lines: LineAssembler,
}

impl<T: Transport, W: Watchdog, H: EventHandler> EspWifi<T, W, H> {
    /// Create a driver. The beacon clock starts now.
    pub fn new(mut transport: T, watchdog: W, handler: H, config: DriverConfig) -> WifiResult<Self> {
        config.validate()?;

        let now = transport.now_millis();
        let state = SessionState::new(config.server_port, config.beacon_interval_ms, now);
        let lines = LineAssembler::with_capacity(config.line_capacity);

        debug!(
            "EspWifi: created (mode={:?}, beacon every {} ms, line capacity {})",
            config.wifi_mode, config.beacon_interval_ms, config.line_capacity
        );

        Ok(EspWifi {
            transport,
            watchdog,
            handler,
            config,
            state,
            lines,
        })
    }
}

impl<T, W, H> EspWifi<T, W, H> {
    /// The configuration in use.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// The serial transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The serial transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The watchdog.
    pub fn watchdog(&self) -> &W {
        &self.watchdog
    }

    /// The event handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// The event handler, mutably.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Whether a `Link` line has been seen.
    pub fn link_state(&self) -> LinkState {
        self.state.link
    }

    /// Current role.
    pub fn role(&self) -> OperatingRole {
        self.state.role
    }

    /// Channel of the most recent inbound packet.
    pub fn reply_channel(&self) -> u8 {
        self.state.reply_channel
    }

    /// Local address and broadcast address, once known.
    pub fn identity(&self) -> Option<NetworkIdentity> {
        self.state.identity
    }

    /// Local address, once known.
    pub fn ip(&self) -> Option<Ipv4Addr> {
        self.state.identity.map(|id| id.ip())
    }

    /// Broadcast address, once known.
    pub fn broadcast(&self) -> Option<Ipv4Addr> {
        self.state.identity.map(|id| id.broadcast())
    }

    /// Port advertised in beacons.
    pub fn server_port(&self) -> u16 {
        self.state.server_port
    }

    /// Beacon settings.
    pub fn beacon(&self) -> &BeaconState {
        &self.state.beacon
    }

    /// Whether beacons are being sent.
    pub fn beacon_enabled(&self) -> bool {
        self.state.beacon.enabled
    }

    /// Whether the missed-beacon watchdog check is active.
    pub fn watchdog_enabled(&self) -> bool {
        self.state.watchdog_enabled
    }

    /// Whether a hardware reset has been requested.
    pub fn is_halted(&self) -> bool {
        self.state.halted
    }

    /// Take the collaborators back.
    pub fn into_parts(self) -> (T, W, H) {
        (self.transport, self.watchdog, self.handler)
    }
}
