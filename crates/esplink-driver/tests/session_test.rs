//! Integration tests for session bring-up, channels, and the send path.
//!
//! Every test drives the public API against a [`SimulatedModem`] and checks
//! the exact AT command lines written to it.

use std::net::Ipv4Addr;

use esplink_driver::sim::{RecordingHandler, SimulatedModem, SimulatedWatchdog};
use esplink_driver::{DriverConfig, EspWifi, OperatingRole, WifiError};

const LOCAL_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 42);

type TestDriver = EspWifi<SimulatedModem, SimulatedWatchdog, RecordingHandler>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Helper to create a driver over the given modem with default settings.
fn driver(modem: SimulatedModem) -> TestDriver {
    init_tracing();
    EspWifi::new(
        modem,
        SimulatedWatchdog::default(),
        RecordingHandler::default(),
        DriverConfig::default(),
    )
    .expect("default config is valid")
}

/// Helper to bring a driver up to a joined station.
fn joined(modem: SimulatedModem) -> TestDriver {
    let mut wifi = driver(modem);
    wifi.initialize().expect("initialize should succeed");
    wifi.connect_wifi("home", "secret").expect("join should succeed");
    wifi
}

// ============================================================================
// Bring-up
// ============================================================================

#[test]
fn test_full_bring_up_command_sequence() {
    let mut wifi = joined(SimulatedModem::esp8266(LOCAL_IP));
    wifi.start_server(8000, 30).expect("server should start");

    let commands = wifi.transport().commands();
    assert_eq!(
        commands,
        &[
            "AT",
            "AT+RST",
            "AT+CWMODE=1",
            "AT+CWJAP=\"home\",\"secret\"",
            "AT+CIPMUX=1",
            "AT+CIFSR",
            "AT+CIPSERVER=1,8000",
            "AT+CIPSTO=30",
        ]
    );

    assert_eq!(wifi.ip(), Some(LOCAL_IP));
    assert_eq!(wifi.broadcast(), Some(Ipv4Addr::new(192, 168, 1, 255)));
    assert_eq!(wifi.role(), OperatingRole::Server);
    assert_eq!(wifi.server_port(), 8000);
}

#[test]
fn test_missing_module_fails_first_step() {
    let mut wifi = driver(SimulatedModem::new());

    let err = wifi.initialize().expect_err("no module should fail");
    assert!(matches!(err, WifiError::ModuleNotPresent));
    assert_eq!(wifi.transport().commands(), &["AT"]);
}

#[test]
fn test_reset_without_ready_fails() {
    let mut modem = SimulatedModem::esp8266(LOCAL_IP);
    modem.on_command("AT+RST", b"\r\nOK\r\n");
    let mut wifi = driver(modem);

    assert!(matches!(wifi.initialize(), Err(WifiError::ResetFailed)));
    assert_eq!(wifi.transport().commands(), &["AT", "AT+RST"]);
}

#[test]
fn test_join_failure_names_network() {
    let mut modem = SimulatedModem::esp8266(LOCAL_IP);
    modem.on_command("AT+CWJAP", b"\r\n+CWJAP:1\r\n\r\nFAIL\r\n");
    let mut wifi = driver(modem);
    wifi.initialize().expect("initialize should succeed");

    match wifi.connect_wifi("home", "wrong") {
        Err(WifiError::JoinFailed { ssid }) => assert_eq!(ssid, "home"),
        other => panic!("expected JoinFailed, got {:?}", other),
    }
    assert!(!wifi.transport().commands().iter().any(|c| c == "AT+CIPMUX=1"));
}

#[test]
fn test_link_mode_failure() {
    let mut modem = SimulatedModem::esp8266(LOCAL_IP);
    modem.on_command("AT+CIPMUX", b"\r\nERROR\r\n");
    let mut wifi = driver(modem);
    wifi.initialize().expect("initialize should succeed");

    assert!(matches!(
        wifi.connect_wifi("home", "secret"),
        Err(WifiError::LinkModeFailed)
    ));
}

#[test]
fn test_join_escapes_credentials() {
    let mut wifi = driver(SimulatedModem::esp8266(LOCAL_IP));
    wifi.connect_wifi("cafe,\"guest\"", "p\\w").expect("join should succeed");

    assert_eq!(
        wifi.transport().commands()[0],
        r#"AT+CWJAP="cafe\,\"guest\"","p\\w""#
    );
}

#[test]
fn test_join_without_address_still_succeeds() {
    let mut modem = SimulatedModem::esp8266(LOCAL_IP);
    modem.on_command("AT+CIFSR", b"\r\nERROR\r\n");
    let mut wifi = joined(modem);

    assert_eq!(wifi.ip(), None);
    assert!(matches!(wifi.query_address(), Err(WifiError::AddressUnavailable)));
}

#[test]
fn test_query_address_refreshes_identity() {
    let mut wifi = joined(SimulatedModem::esp8266(LOCAL_IP));
    wifi.transport_mut().on_command("AT+CIFSR", "10.1.2.3\r\n\r\nOK\r\n");

    let identity = wifi.query_address().expect("address should parse");
    assert_eq!(identity.ip(), Ipv4Addr::new(10, 1, 2, 3));
    assert_eq!(wifi.broadcast(), Some(Ipv4Addr::new(10, 1, 2, 255)));
}

#[test]
fn test_disconnect() {
    let mut wifi = joined(SimulatedModem::esp8266(LOCAL_IP));
    wifi.disconnect_wifi().expect("leave should succeed");
    assert_eq!(wifi.transport().commands().last().map(String::as_str), Some("AT+CWQAP"));

    wifi.transport_mut().silence("AT+CWQAP");
    assert!(matches!(wifi.disconnect_wifi(), Err(WifiError::DisconnectFailed)));
}

// ============================================================================
// Channels
// ============================================================================

#[test]
fn test_server_idle_timeout_failure() {
    let mut modem = SimulatedModem::esp8266(LOCAL_IP);
    modem.on_command("AT+CIPSTO", b"\r\nERROR\r\n");
    let mut wifi = joined(modem);

    match wifi.start_server(9000, 10) {
        Err(WifiError::ServerStartFailed { port }) => assert_eq!(port, 9000),
        other => panic!("expected ServerStartFailed, got {:?}", other),
    }
    assert_eq!(wifi.role(), OperatingRole::None);
}

#[test]
fn test_client_connects_on_client_channel() {
    let mut wifi = joined(SimulatedModem::esp8266(LOCAL_IP));
    wifi.start_client("10.0.0.5", 8080, 3000).expect("connect should succeed");

    assert_eq!(
        wifi.transport().commands().last().map(String::as_str),
        Some("AT+CIPSTART=3,\"TCP\",\"10.0.0.5\",8080")
    );
    assert_eq!(wifi.role(), OperatingRole::Client);
}

#[test]
fn test_client_timeout_has_floor() {
    let mut modem = SimulatedModem::esp8266(LOCAL_IP);
    modem.silence("AT+CIPSTART");
    let mut wifi = joined(modem);

    let start = wifi.transport().now();
    let err = wifi.start_client("10.0.0.5", 80, 10).expect_err("no reply should fail");
    assert!(matches!(err, WifiError::ClientStartFailed { port: 80, .. }));
    assert!(wifi.transport().now() - start >= 1000);
}

#[test]
fn test_udp_channel_failure() {
    let mut modem = SimulatedModem::esp8266(LOCAL_IP);
    modem.on_command("AT+CIPSTART", b"\r\nERROR\r\n");
    let mut wifi = joined(modem);

    assert!(matches!(
        wifi.start_udp_channel(4, "10.0.0.9", 5000),
        Err(WifiError::UdpChannelFailed { channel: 4, port: 5000, .. })
    ));
}

// ============================================================================
// Sending
// ============================================================================

#[test]
fn test_send_writes_header_then_raw_payload() {
    let mut wifi = joined(SimulatedModem::esp8266(LOCAL_IP));
    wifi.start_client("10.0.0.5", 8080, 3000).expect("connect should succeed");
    wifi.transport_mut().clear_log();

    wifi.send(b"hello").expect("send should succeed");

    assert_eq!(wifi.transport().commands(), &["AT+CIPSEND=3,5"]);
    assert_eq!(wifi.transport().payloads(), &[b"hello".to_vec()]);
    assert_eq!(wifi.transport().written(), b"AT+CIPSEND=3,5\r\nhello");
}

#[test]
fn test_send_without_confirmation_fails() {
    let mut modem = SimulatedModem::esp8266(LOCAL_IP);
    modem.on_command("AT+CIPSEND", b"\r\nSEND FAIL\r\n");
    let mut wifi = joined(modem);

    match wifi.send(b"hello") {
        Err(WifiError::SendFailed { channel, length }) => {
            assert_eq!(channel, 3);
            assert_eq!(length, 5);
        }
        other => panic!("expected SendFailed, got {:?}", other),
    }

    // The guard is free again.
    wifi.transport_mut().on_command("AT+CIPSEND", b"\r\nSEND OK\r\n");
    wifi.send(b"again").expect("retry should succeed");
}

#[test]
fn test_send_discards_stale_input_first() {
    let mut wifi = joined(SimulatedModem::esp8266(LOCAL_IP));
    // A stale confirmation must not satisfy the next send.
    wifi.transport_mut().push_input(b"\r\nSEND OK\r\n");
    wifi.transport_mut().silence("AT+CIPSEND");

    assert!(matches!(wifi.send(b"x"), Err(WifiError::SendFailed { .. })));
}

#[test]
fn test_server_replies_on_last_inbound_channel() {
    let mut wifi = joined(SimulatedModem::esp8266(LOCAL_IP));
    wifi.start_server(8000, 30).expect("server should start");

    wifi.transport_mut().push_input(b"Link\r\n+IPD,4,4:ping\r\n");
    wifi.process_input();
    assert_eq!(wifi.reply_channel(), 4);

    wifi.transport_mut().clear_log();
    wifi.send(b"pong").expect("send should succeed");
    wifi.close_connection().expect("close should succeed");

    assert_eq!(
        wifi.transport().commands(),
        &["AT+CIPSEND=4,4", "AT+CIPCLOSE=4"]
    );
}

#[test]
fn test_close_failure_names_channel() {
    let mut modem = SimulatedModem::esp8266(LOCAL_IP);
    modem.on_command("AT+CIPCLOSE", b"\r\nERROR\r\n");
    let mut wifi = joined(modem);

    assert!(matches!(wifi.close_connection(), Err(WifiError::CloseFailed(3))));
}

// ============================================================================
// Scanning and configuration
// ============================================================================

#[test]
fn test_scan_captures_raw_listing() {
    let mut wifi = joined(SimulatedModem::esp8266(LOCAL_IP));

    let mut buffer = [0u8; 512];
    let count = wifi.scan(&mut buffer).expect("scan should succeed");
    let listing = String::from_utf8_lossy(&buffer[..count]);

    assert!(listing.contains("+CWLAP:(3,\"home\""));
    assert!(listing.contains("\"office\""));
    assert!(listing.ends_with("OK\r\n"));
}

#[test]
fn test_scan_truncates_to_buffer() {
    let mut wifi = joined(SimulatedModem::esp8266(LOCAL_IP));

    let mut buffer = [0u8; 8];
    let count = wifi.scan(&mut buffer).expect("scan should succeed");

    assert_eq!(count, 8);
    assert_eq!(&buffer, b"+CWLAP:(");
    assert_eq!(wifi.transport().pending_input(), 0);
}

#[test]
fn test_yaml_config_drives_channels() {
    init_tracing();
    let config = DriverConfig::from_yaml_str("client_channel: 4\nserver_port: 9000\n")
        .expect("config should parse");
    let mut wifi = EspWifi::new(
        SimulatedModem::esp8266(LOCAL_IP),
        SimulatedWatchdog::default(),
        RecordingHandler::default(),
        config,
    )
    .expect("config is valid");

    assert_eq!(wifi.server_port(), 9000);
    wifi.start_client("10.0.0.5", 80, 1000).expect("connect should succeed");
    wifi.send(b"hi").expect("send should succeed");
    assert!(wifi.transport().commands().iter().any(|c| c == "AT+CIPSEND=4,2"));
}

#[test]
fn test_invalid_config_rejected_at_construction() {
    let config = DriverConfig {
        beacon_channel: 1,
        ..Default::default()
    };
    let result = EspWifi::new(SimulatedModem::new(), SimulatedWatchdog::default(), (), config);
    assert!(matches!(result, Err(WifiError::InvalidConfig(_))));
}
