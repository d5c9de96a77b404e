//! Driver configuration.
//!
//! Every timeout and channel assignment the driver uses lives here, so a host
//! can tune them from a YAML file:
//!
//! ```yaml
//! wifi_mode: station
//! server_port: 8080
//! beacon_interval_ms: 5000
//! ```
//!
//! Fields that are omitted keep their defaults.

use std::collections::HashSet;
use std::path::Path;

use esplink_at_protocol::{WifiMode, BEACON_PORT, DEFAULT_LINE_CAPACITY};
use serde::{Deserialize, Serialize};

use crate::error::{WifiError, WifiResult};

/// Default beacon interval.
pub const DEFAULT_BEACON_INTERVAL_MS: u64 = 6733;

/// Driver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverConfig {
    /// Mode selected during initialization.
    pub wifi_mode: WifiMode,
    /// Port advertised in beacons until a server is started.
    pub server_port: u16,
    /// Channel used by `AT+CIPSERVER`.
    pub server_channel: u8,
    /// Channel beacons are sent on.
    pub beacon_channel: u8,
    /// Channel used for client connections.
    pub client_channel: u8,
    /// UDP port beacons are broadcast to.
    pub beacon_port: u16,
    /// Time between beacons.
    pub beacon_interval_ms: u64,
    /// Missed beacon intervals tolerated before a hardware reset.
    pub reset_after_missed_intervals: u64,
    /// Timeout for ordinary commands.
    pub command_timeout_ms: u64,
    /// Timeout for joining an access point.
    pub join_timeout_ms: u64,
    /// Timeout waiting for `SEND OK`.
    pub send_timeout_ms: u64,
    /// Quiet period drained before every send.
    pub send_settle_ms: u64,
    /// Lower bound for client connect timeouts.
    pub min_client_timeout_ms: u64,
    /// Wait between `AT+CIFSR` and reading its output.
    pub address_settle_ms: u64,
    /// How long `AT+CWLAP` output is captured.
    pub scan_timeout_ms: u64,
    /// Hardware watchdog timeout.
    pub watchdog_timeout_ms: u32,
    /// Receive line buffer capacity.
    pub line_capacity: usize,
    /// Longest accepted device name.
    pub max_device_name_len: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            wifi_mode: WifiMode::Station,
            server_port: 8000,
            server_channel: 1,
            beacon_channel: 2,
            client_channel: 3,
            beacon_port: BEACON_PORT,
            beacon_interval_ms: DEFAULT_BEACON_INTERVAL_MS,
            reset_after_missed_intervals: 3,
            command_timeout_ms: 5000,
            join_timeout_ms: 5000,
            send_timeout_ms: 10_000,
            send_settle_ms: 500,
            min_client_timeout_ms: 1000,
            address_settle_ms: 500,
            scan_timeout_ms: 10_000,
            watchdog_timeout_ms: 8000,
            line_capacity: DEFAULT_LINE_CAPACITY,
            max_device_name_len: 47,
        }
    }
}

impl DriverConfig {
    /// Parse a configuration from YAML and validate it.
    pub fn from_yaml_str(yaml: &str) -> WifiResult<Self> {
        let config: DriverConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a YAML file and validate it.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> WifiResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Check the configuration for values the driver cannot work with.
    pub fn validate(&self) -> WifiResult<()> {
        if self.beacon_interval_ms == 0 {
            return Err(WifiError::InvalidConfig(
                "beacon_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.reset_after_missed_intervals == 0 {
            return Err(WifiError::InvalidConfig(
                "reset_after_missed_intervals must be non-zero".to_string(),
            ));
        }
        if self.line_capacity == 0 {
            return Err(WifiError::InvalidConfig(
                "line_capacity must be non-zero".to_string(),
            ));
        }

        let channels = [self.server_channel, self.beacon_channel, self.client_channel];
        let unique: HashSet<u8> = channels.iter().copied().collect();
        if unique.len() != channels.len() {
            return Err(WifiError::InvalidConfig(format!(
                "server, beacon and client channels must differ, got {:?}",
                channels
            )));
        }

        Ok(())
    }

    /// Elapsed time without a successful beacon that triggers a hardware reset.
    pub fn reset_threshold_ms(&self) -> u64 {
        self.beacon_interval_ms
            .saturating_mul(self.reset_after_missed_intervals)
    }
}
