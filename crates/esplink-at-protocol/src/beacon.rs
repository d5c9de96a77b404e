//! Discovery beacon datagram.

use std::net::Ipv4Addr;

/// Default UDP port beacons are broadcast to.
pub const BEACON_PORT: u16 = 34807;

/// A discovery beacon advertising where this device's server listens.
///
/// Encodes to a single JSON object line:
///
/// ```text
/// {"event": "beacon", "ip": "192.168.1.42", "port": 8000, "device": "kitchen"}\r\n
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Beacon<'a> {
    /// Local address of the device.
    pub ip: Ipv4Addr,
    /// Port the device's server listens on.
    pub port: u16,
    /// Device name.
    pub device: &'a str,
}

impl<'a> Beacon<'a> {
    /// Create a beacon.
    pub fn new(ip: Ipv4Addr, port: u16, device: &'a str) -> Self {
        Beacon { ip, port, device }
    }

    /// Encode the datagram payload, including the trailing `\r\n`.
    ///
    /// The device name is written as a JSON string literal, quoted and escaped.
    pub fn encode(&self) -> Vec<u8> {
        format!(
            "{{\"event\": \"beacon\", \"ip\": \"{}\", \"port\": {}, \"device\": {}}}\r\n",
            self.ip,
            self.port,
            serde_json::Value::from(self.device)
        )
        .into_bytes()
    }
}
