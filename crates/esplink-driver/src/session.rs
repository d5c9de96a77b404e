//! Session setup and teardown.
//!
//! Bring-up is a fixed sequence, each step waiting for its success token:
//!
//! 1. [`initialize`](EspWifi::initialize): `AT`, `AT+RST`, `AT+CWMODE`
//! 2. [`connect_wifi`](EspWifi::connect_wifi): `AT+CWJAP`, `AT+CIPMUX=1`,
//!    `AT+CIFSR`
//! 3. [`start_server`](EspWifi::start_server) or
//!    [`start_client`](EspWifi::start_client)
//!
//! The first failing step returns its own error variant. Nothing is retried.

use std::net::Ipv4Addr;

use esplink_at_protocol::{parse_local_address, Command, LinkProtocol};
use tracing::{debug, info, warn};

use crate::driver::EspWifi;
use crate::error::{WifiError, WifiResult};
use crate::metrics::metric_defs;
use crate::state::{NetworkIdentity, OperatingRole};
use crate::transport::{Transport, Watchdog};

/// Most `AT+CIFSR` output kept for address parsing.
const ADDRESS_OUTPUT_LIMIT: usize = 512;

impl<T: Transport, W: Watchdog, H> EspWifi<T, W, H> {
    // ========================================================================
    // Bring-up
    // ========================================================================

    /// Check the module is present, reset it, and select the WiFi mode.
    pub fn initialize(&mut self) -> WifiResult<()> {
        let timeout = self.config.command_timeout_ms;

        self.execute(&Command::Test, timeout, || WifiError::ModuleNotPresent)?;
        self.execute(&Command::Reset, timeout, || WifiError::ResetFailed)?;

        let mode = self.config.wifi_mode;
        self.execute(&Command::SetMode { mode }, timeout, || WifiError::ResetFailed)?;
        self.clear_input();
        self.lines.clear();

        info!("Session: module ready (mode {:?})", mode);
        Ok(())
    }

    /// Join an access point, enable multi-channel mode, and learn the local
    /// address.
    ///
    /// A missing address is logged but does not fail the join.
    pub fn connect_wifi(&mut self, ssid: &str, password: &str) -> WifiResult<()> {
        let join = Command::JoinAccessPoint {
            ssid: ssid.to_string(),
            password: password.to_string(),
        };
        self.execute(&join, self.config.join_timeout_ms, || WifiError::JoinFailed {
            ssid: ssid.to_string(),
        })?;

        self.set_link_mode(true)?;

        match self.query_address() {
            Ok(identity) => info!(
                "Session: joined {:?} as {} (broadcast {})",
                ssid,
                identity.ip(),
                identity.broadcast()
            ),
            Err(err) => warn!("Session: joined {:?} but {}", ssid, err),
        }

        Ok(())
    }

    /// Leave the current access point.
    pub fn disconnect_wifi(&mut self) -> WifiResult<()> {
        let timeout = self.config.command_timeout_ms;
        self.execute(&Command::QuitAccessPoint, timeout, || WifiError::DisconnectFailed)?;
        info!("Session: left network");
        Ok(())
    }

    /// Enable (`true`) or disable multi-channel mode.
    pub fn set_link_mode(&mut self, multi: bool) -> WifiResult<()> {
        let timeout = self.config.command_timeout_ms;
        self.execute(&Command::SetMultiplex { multi }, timeout, || WifiError::LinkModeFailed)
    }

    /// Ask the module for its address and update the network identity.
    pub fn query_address(&mut self) -> WifiResult<NetworkIdentity> {
        self.clear_input();
        self.write_command(&Command::QueryAddress)?;
        self.transport.delay_ms(self.config.address_settle_ms);

        let mut output = Vec::with_capacity(ADDRESS_OUTPUT_LIMIT);
        while self.transport.available() > 0 {
            let Some(byte) = self.transport.read_byte() else {
                break;
            };
            if output.len() < ADDRESS_OUTPUT_LIMIT {
                output.push(byte);
            }
        }

        let ip = parse_local_address(&output).ok_or(WifiError::AddressUnavailable)?;
        Ok(self.set_address(ip))
    }

    fn set_address(&mut self, ip: Ipv4Addr) -> NetworkIdentity {
        let identity = match self.state.identity {
            Some(mut identity) => {
                identity.set_ip(ip);
                identity
            }
            None => NetworkIdentity::new(ip),
        };
        self.state.identity = Some(identity);
        debug!("Session: address {} broadcast {}", identity.ip(), identity.broadcast());
        identity
    }

    // ========================================================================
    // Channels
    // ========================================================================

    /// Start a TCP server on `port` with an idle timeout in seconds.
    pub fn start_server(&mut self, port: u16, idle_timeout_secs: u32) -> WifiResult<()> {
        let timeout = self.config.command_timeout_ms;
        self.state.server_port = port;

        let start = Command::StartServer {
            channel: self.config.server_channel,
            port,
        };
        self.execute(&start, timeout, || WifiError::ServerStartFailed { port })?;

        let idle = Command::SetServerTimeout {
            seconds: idle_timeout_secs,
        };
        self.execute(&idle, timeout, || WifiError::ServerStartFailed { port })?;

        self.state.role = OperatingRole::Server;
        info!("Session: serving on port {}", port);
        Ok(())
    }

    /// Open a TCP connection to `address:port`.
    ///
    /// `timeout_ms` is raised to the configured minimum.
    pub fn start_client(&mut self, address: &str, port: u16, timeout_ms: u64) -> WifiResult<()> {
        let timeout = timeout_ms.max(self.config.min_client_timeout_ms);
        let connect = Command::StartConnection {
            channel: self.config.client_channel,
            protocol: LinkProtocol::Tcp,
            address: address.to_string(),
            port,
        };
        self.execute(&connect, timeout, || WifiError::ClientStartFailed {
            address: address.to_string(),
            port,
        })?;

        self.state.role = OperatingRole::Client;
        info!("Session: connected to {}:{}", address, port);
        Ok(())
    }

    /// Open a UDP channel to `address:port`.
    pub fn start_udp_channel(&mut self, channel: u8, address: &str, port: u16) -> WifiResult<()> {
        let timeout = self.config.command_timeout_ms;
        let open = Command::StartConnection {
            channel,
            protocol: LinkProtocol::Udp,
            address: address.to_string(),
            port,
        };
        self.execute(&open, timeout, || WifiError::UdpChannelFailed {
            channel,
            address: address.to_string(),
            port,
        })
    }

    /// Close the active connection.
    pub fn close_connection(&mut self) -> WifiResult<()> {
        let channel = self.active_channel();
        let timeout = self.config.command_timeout_ms;
        self.execute(&Command::Close { channel }, timeout, || WifiError::CloseFailed(channel))?;
        debug!("Session: closed channel {}", channel);
        Ok(())
    }

    /// Channel outbound traffic goes to: the reply channel as a server, the
    /// client channel otherwise.
    pub fn active_channel(&self) -> u8 {
        match self.state.role {
            OperatingRole::Server => self.state.reply_channel,
            OperatingRole::Client | OperatingRole::None => self.config.client_channel,
        }
    }

    // ========================================================================
    // Sending
    // ========================================================================

    /// Send `payload` on the active channel.
    pub fn send(&mut self, payload: &[u8]) -> WifiResult<()> {
        let channel = self.active_channel();
        self.send_on(channel, payload)
    }

    /// Send `payload` on `channel` and wait for `SEND OK`.
    ///
    /// Fails with [`WifiError::SendInProgress`], writing nothing, while
    /// another send holds the send guard.
    pub fn send_on(&mut self, channel: u8, payload: &[u8]) -> WifiResult<()> {
        if self.state.halted {
            return Err(WifiError::Halted);
        }
        if !self.state.send_guard.try_acquire() {
            debug!("Session: send on channel {} rejected, send in progress", channel);
            metric_defs::SEND_FAILURES.increment();
            return Err(WifiError::SendInProgress);
        }

        let result = self.transmit(channel, payload);
        self.state.send_guard.release();

        match &result {
            Ok(()) => {
                metric_defs::PAYLOADS_SENT.increment();
                metric_defs::PAYLOAD_BYTES_SENT.add(payload.len() as u64);
            }
            Err(_) => metric_defs::SEND_FAILURES.increment(),
        }
        result
    }

    fn transmit(&mut self, channel: u8, payload: &[u8]) -> WifiResult<()> {
        self.drain_input(self.config.send_settle_ms);

        self.write_command(&Command::Send {
            channel,
            length: payload.len(),
        })?;
        self.transport.write(payload)?;

        if !self.await_substring(esplink_at_protocol::TOKEN_SEND_OK, self.config.send_timeout_ms) {
            return Err(WifiError::SendFailed {
                channel,
                length: payload.len(),
            });
        }
        Ok(())
    }

    // ========================================================================
    // Beacon and watchdog
    // ========================================================================

    /// Arm the hardware watchdog and start the missed-beacon check.
    pub fn enable_watchdog(&mut self) {
        self.watchdog.arm(self.config.watchdog_timeout_ms);
        self.state.watchdog_enabled = true;
        info!("Session: watchdog armed ({} ms)", self.config.watchdog_timeout_ms);
    }

    /// Enable beacons.
    ///
    /// With a device name, opens the UDP beacon channel to the broadcast
    /// address; only allowed as a server. Without one, re-enables beacons
    /// using the existing channel and name.
    pub fn enable_beacon(&mut self, device: Option<&str>) -> WifiResult<()> {
        let Some(device) = device else {
            self.state.beacon.enabled = true;
            return Ok(());
        };

        if self.state.role != OperatingRole::Server {
            return Err(WifiError::BeaconRequiresServer);
        }
        if device.len() > self.config.max_device_name_len {
            return Err(WifiError::Overflow {
                max: self.config.max_device_name_len,
                actual: device.len(),
            });
        }
        let broadcast = self.state.identity.ok_or(WifiError::AddressUnavailable)?.broadcast();

        self.state.beacon.device = device.to_string();
        let opened = self.start_udp_channel(
            self.config.beacon_channel,
            &broadcast.to_string(),
            self.config.beacon_port,
        );
        self.state.beacon.enabled = opened.is_ok();
        opened?;

        info!(
            "Session: beaconing as {:?} to {}:{}",
            device, broadcast, self.config.beacon_port
        );
        Ok(())
    }

    /// Stop sending beacons.
    pub fn disable_beacon(&mut self) {
        self.state.beacon.enabled = false;
    }

    // ========================================================================
    // Scanning
    // ========================================================================

    /// List access points, copying raw `AT+CWLAP` output into `out` until the
    /// scan timeout. Returns the number of bytes copied; output past the end
    /// of `out` is read and dropped.
    pub fn scan(&mut self, out: &mut [u8]) -> WifiResult<usize> {
        debug!("Session: scanning, capture buffer {} bytes", out.len());
        self.write_command(&Command::ListAccessPoints)?;

        let timeout = self.config.scan_timeout_ms;
        let start = self.transport.now_millis();
        let mut count = 0;
        loop {
            if let Some(byte) = self.transport.read_byte() {
                if count < out.len() {
                    out[count] = byte;
                    count += 1;
                }
            }
            if self.transport.now_millis().saturating_sub(start) >= timeout {
                break;
            }
        }

        Ok(count)
    }
}
