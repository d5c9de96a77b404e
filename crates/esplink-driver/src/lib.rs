//! Polling driver for ESP8266-class AT-command WiFi modules.
//!
//! [`EspWifi`] owns a serial [`Transport`], a [`Watchdog`] and an
//! [`EventHandler`]. The host brings the session up once and then calls
//! [`EspWifi::run`] from its main loop:
//!
//! ```rust
//! use std::net::Ipv4Addr;
//!
//! use esplink_driver::sim::{RecordingHandler, SimulatedModem, SimulatedWatchdog};
//! use esplink_driver::{DriverConfig, EspWifi, PollOutcome};
//!
//! let modem = SimulatedModem::esp8266(Ipv4Addr::new(192, 168, 1, 42));
//! let mut wifi = EspWifi::new(
//!     modem,
//!     SimulatedWatchdog::default(),
//!     RecordingHandler::default(),
//!     DriverConfig::default(),
//! )?;
//!
//! wifi.initialize()?;
//! wifi.connect_wifi("home", "secret")?;
//! wifi.start_server(8000, 30)?;
//! wifi.enable_beacon(Some("thermostat"))?;
//! wifi.enable_watchdog();
//!
//! wifi.transport_mut().push_input(b"Link\r\n+IPD,0,4:ping\r\n");
//! assert!(matches!(wifi.run(), PollOutcome::Received(_)));
//! assert_eq!(wifi.handler().payloads, vec![b"ping".to_vec()]);
//!
//! wifi.send(b"pong")?;
//! # Ok::<(), esplink_driver::WifiError>(())
//! ```
//!
//! Nothing runs in the background. Inbound data is only seen inside `run`,
//! and replies to a command are only matched while that command waits.

mod beacon;
mod classifier;
mod config;
mod driver;
mod error;
mod matcher;
pub mod metrics;
mod session;
pub mod sim;
mod state;
mod transport;

pub use beacon::PollOutcome;
pub use classifier::InputSummary;
pub use config::{DriverConfig, DEFAULT_BEACON_INTERVAL_MS};
pub use driver::EspWifi;
pub use error::{WifiError, WifiResult};
pub use state::{BeaconState, LinkState, NetworkIdentity, OperatingRole, SendGuard};
pub use transport::{EventHandler, NoWatchdog, Transport, Watchdog};

pub use esplink_at_protocol as protocol;
