//! Session state owned by the driver.

use std::net::Ipv4Addr;

use esplink_at_protocol::broadcast_address;

/// Whether the module has reported an established connection.
///
/// Only ever moves to `LinkUp`; `Unlink` lines are not tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// No `Link` seen yet.
    #[default]
    Disconnected,
    /// A `Link` line was received.
    LinkUp,
}

/// Role selected by starting a server or a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatingRole {
    /// Neither started.
    #[default]
    None,
    /// Listening; replies go to the last channel data arrived on.
    Server,
    /// Connected out on the client channel.
    Client,
}

/// Local address and its /24 broadcast address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkIdentity {
    ip: Ipv4Addr,
    broadcast: Ipv4Addr,
}

impl NetworkIdentity {
    /// Create an identity, deriving the broadcast address.
    pub fn new(ip: Ipv4Addr) -> Self {
        NetworkIdentity {
            ip,
            broadcast: broadcast_address(ip),
        }
    }

    /// Local address.
    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    /// Broadcast address (`a.b.c.255`).
    pub fn broadcast(&self) -> Ipv4Addr {
        self.broadcast
    }

    /// Replace the address; the broadcast address follows it.
    pub fn set_ip(&mut self, ip: Ipv4Addr) {
        self.ip = ip;
        self.broadcast = broadcast_address(ip);
    }
}

/// Beacon settings and the time of the last successful beacon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconState {
    /// Name advertised in beacons.
    pub device: String,
    /// Whether beacons are sent.
    pub enabled: bool,
    /// Time between beacons.
    pub interval_ms: u64,
    /// When the last beacon was confirmed sent.
    pub last_success_ms: u64,
}

/// At most one outbound send in flight.
///
/// A non-blocking try-lock: a second acquire fails instead of waiting.
#[derive(Debug, Default)]
pub struct SendGuard {
    busy: bool,
}

impl SendGuard {
    /// Take the guard. Returns `false` if it is already held.
    pub fn try_acquire(&mut self) -> bool {
        if self.busy {
            return false;
        }
        self.busy = true;
        true
    }

    /// Give the guard back.
    pub fn release(&mut self) {
        self.busy = false;
    }

    /// Whether a send holds the guard.
    pub fn is_busy(&self) -> bool {
        self.busy
    }
}

/// Everything the driver mutates while a session runs.
#[derive(Debug)]
pub(crate) struct SessionState {
    pub(crate) link: LinkState,
    pub(crate) role: OperatingRole,
    pub(crate) reply_channel: u8,
    pub(crate) identity: Option<NetworkIdentity>,
    pub(crate) server_port: u16,
    pub(crate) beacon: BeaconState,
    pub(crate) send_guard: SendGuard,
    pub(crate) watchdog_enabled: bool,
    pub(crate) halted: bool,
}

impl SessionState {
    pub(crate) fn new(server_port: u16, beacon_interval_ms: u64, now_ms: u64) -> Self {
        SessionState {
            link: LinkState::Disconnected,
            role: OperatingRole::None,
            reply_channel: 0,
            identity: None,
            server_port,
            beacon: BeaconState {
                device: String::new(),
                enabled: false,
                interval_ms: beacon_interval_ms,
                last_success_ms: now_ms,
            },
            send_guard: SendGuard::default(),
            watchdog_enabled: false,
            halted: false,
        }
    }
}
