//! Error types for the driver.

use esplink_at_protocol::AtError;
use thiserror::Error;

/// Errors that can occur while driving the WiFi module.
///
/// The setup variants are distinct so a caller can tell which step of the
/// bring-up sequence failed; none of them is retried by the driver.
#[derive(Debug, Error)]
pub enum WifiError {
    /// The module did not answer `AT` with `OK`.
    #[error("WiFi module not present: no OK in response to AT")]
    ModuleNotPresent,

    /// The module did not report `ready` after `AT+RST`.
    #[error("WiFi module reset failed: no ready after AT+RST")]
    ResetFailed,

    /// Joining the access point failed.
    #[error("failed to join network {ssid:?}")]
    JoinFailed {
        /// Network that was joined.
        ssid: String,
    },

    /// Switching multi-channel mode failed.
    #[error("failed to set link mode")]
    LinkModeFailed,

    /// The TCP server could not be started.
    #[error("failed to start TCP server on port {port}")]
    ServerStartFailed {
        /// Requested listening port.
        port: u16,
    },

    /// The TCP client connection could not be opened.
    #[error("failed to connect to {address}:{port}")]
    ClientStartFailed {
        /// Remote address.
        address: String,
        /// Remote port.
        port: u16,
    },

    /// A UDP channel could not be opened.
    #[error("failed to open UDP channel {channel} to {address}:{port}")]
    UdpChannelFailed {
        /// Channel that was opened.
        channel: u8,
        /// Remote address.
        address: String,
        /// Remote port.
        port: u16,
    },

    /// Another send is still in flight.
    #[error("a send is already in progress")]
    SendInProgress,

    /// The module did not confirm the send.
    #[error("no SEND OK for {length} bytes on channel {channel}")]
    SendFailed {
        /// Channel the payload was sent on.
        channel: u8,
        /// Payload length.
        length: usize,
    },

    /// Closing a connection failed.
    #[error("failed to close channel {0}")]
    CloseFailed(u8),

    /// Leaving the access point failed.
    #[error("failed to leave network")]
    DisconnectFailed,

    /// Beacons can only be enabled while running as a server.
    #[error("beacon requires server role")]
    BeaconRequiresServer,

    /// No local address is known yet.
    #[error("no local address assigned")]
    AddressUnavailable,

    /// A bounded field was given more bytes than it holds.
    #[error("overflow: max {max} bytes, got {actual}")]
    Overflow {
        /// Capacity.
        max: usize,
        /// Bytes offered.
        actual: usize,
    },

    /// A hardware reset was requested; the driver makes no further progress.
    #[error("driver halted awaiting hardware reset")]
    Halted,

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be parsed.
    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Protocol-level error.
    #[error("protocol error: {0}")]
    Protocol(#[from] AtError),

    /// Transport I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for driver operations.
pub type WifiResult<T> = Result<T, WifiError>;
