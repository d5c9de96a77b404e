//! Commands that can be sent to the WiFi co-processor.
//!
//! The module speaks the classic ESP8266 AT dialect:
//! - Basic commands (`AT`, `AT+RST`)
//! - Station commands (`AT+CWMODE`, `AT+CWJAP`, `AT+CWQAP`, `AT+CWLAP`)
//! - TCP/IP commands (`AT+CIPMUX`, `AT+CIFSR`, `AT+CIPSERVER`, `AT+CIPSTO`,
//!   `AT+CIPSTART`, `AT+CIPSEND`, `AT+CIPCLOSE`)

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::codec::encode_command;

/// Success token for most commands.
pub const TOKEN_OK: &str = "OK";

/// Success token printed once the module has rebooted.
pub const TOKEN_READY: &str = "ready";

/// Success token printed after a payload has been transmitted.
pub const TOKEN_SEND_OK: &str = "SEND OK";

/// WiFi operating mode (`AT+CWMODE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum WifiMode {
    /// Station only.
    #[default]
    Station,
    /// Soft access point only.
    AccessPoint,
    /// Station and soft access point.
    StationAndAccessPoint,
}

impl WifiMode {
    /// Numeric mode used on the wire.
    pub fn as_u8(&self) -> u8 {
        match self {
            WifiMode::Station => 1,
            WifiMode::AccessPoint => 2,
            WifiMode::StationAndAccessPoint => 3,
        }
    }
}

/// Transport protocol for `AT+CIPSTART`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkProtocol {
    /// TCP stream.
    Tcp,
    /// UDP datagrams.
    Udp,
}

impl LinkProtocol {
    /// Protocol name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkProtocol::Tcp => "TCP",
            LinkProtocol::Udp => "UDP",
        }
    }
}

/// Commands understood by the co-processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // ========== Basic ==========
    /// Presence check (`AT`).
    Test,

    /// Restart the module (`AT+RST`).
    Reset,

    // ========== Station ==========
    /// Select the WiFi mode.
    SetMode {
        /// Mode to select.
        mode: WifiMode,
    },

    /// Join an access point.
    JoinAccessPoint {
        /// Network name.
        ssid: String,
        /// Network password.
        password: String,
    },

    /// Leave the current access point.
    QuitAccessPoint,

    /// List visible access points.
    ListAccessPoints,

    // ========== TCP/IP ==========
    /// Enable or disable multiple connections.
    SetMultiplex {
        /// `true` for multi-channel mode.
        multi: bool,
    },

    /// Query the local addresses.
    QueryAddress,

    /// Start a TCP server.
    StartServer {
        /// Server channel.
        channel: u8,
        /// Listening port.
        port: u16,
    },

    /// Set the server idle timeout.
    SetServerTimeout {
        /// Timeout in seconds.
        seconds: u32,
    },

    /// Open a TCP connection or UDP channel.
    StartConnection {
        /// Channel to open.
        channel: u8,
        /// TCP or UDP.
        protocol: LinkProtocol,
        /// Remote address.
        address: String,
        /// Remote port.
        port: u16,
    },

    /// Announce a payload of `length` bytes on `channel`.
    Send {
        /// Channel to send on.
        channel: u8,
        /// Number of payload bytes that follow.
        length: usize,
    },

    /// Close a connection.
    Close {
        /// Channel to close.
        channel: u8,
    },
}

impl Command {
    /// Encode the command as a line to send to the module.
    /// Returns the bytes to send (including the `\r\n` terminator).
    pub fn encode(&self) -> Vec<u8> {
        encode_command(&self.to_command_string())
    }

    /// Get the command string without the terminator.
    pub fn to_command_string(&self) -> String {
        match self {
            Command::Test => "AT".to_string(),
            Command::Reset => "AT+RST".to_string(),

            Command::SetMode { mode } => format!("AT+CWMODE={}", mode.as_u8()),
            Command::JoinAccessPoint { ssid, password } => format!(
                "AT+CWJAP=\"{}\",\"{}\"",
                escape_string(ssid),
                escape_string(password)
            ),
            Command::QuitAccessPoint => "AT+CWQAP".to_string(),
            Command::ListAccessPoints => "AT+CWLAP".to_string(),

            Command::SetMultiplex { multi } => format!("AT+CIPMUX={}", u8::from(*multi)),
            Command::QueryAddress => "AT+CIFSR".to_string(),
            Command::StartServer { channel, port } => {
                format!("AT+CIPSERVER={},{}", channel, port)
            }
            Command::SetServerTimeout { seconds } => format!("AT+CIPSTO={}", seconds),
            Command::StartConnection { channel, protocol, address, port } => format!(
                "AT+CIPSTART={},\"{}\",\"{}\",{}",
                channel,
                protocol.as_str(),
                address,
                port
            ),
            Command::Send { channel, length } => format!("AT+CIPSEND={},{}", channel, length),
            Command::Close { channel } => format!("AT+CIPCLOSE={}", channel),

        }
    }

    /// Token that signals success, if the command waits for one.
    ///
    /// `AT+CWMODE` is fire-and-forget, `AT+CIFSR` and `AT+CWLAP` are read
    /// as raw output.
    pub fn success_token(&self) -> Option<&'static str> {
        match self {
            Command::Reset => Some(TOKEN_READY),
            Command::Send { .. } => Some(TOKEN_SEND_OK),
            Command::SetMode { .. }
            | Command::QueryAddress
            | Command::ListAccessPoints => None,
            _ => Some(TOKEN_OK),
        }
    }
}

/// Escape the characters the AT parser treats specially inside quotes.
fn escape_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | ',' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
