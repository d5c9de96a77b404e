//! Replays a captured module transcript through the line assembler and
//! classifier.

use std::net::Ipv4Addr;

use esplink_at_protocol::{
    parse_local_address, Command, InboundMessage, LineAssembler, SubstringMatcher, TOKEN_READY,
};

/// Output of a module booting, joining, and serving two clients.
const TRANSCRIPT: &[u8] = b"\r\n ets Jan  8 2013,rst cause:2, boot mode:(3,6)\r\n\
\r\nready\r\n\
WIFI CONNECTED\r\nWIFI GOT IP\r\n\
0,CONNECT\r\nLink\r\n\r\n+IPD,0,5:hello\r\nOK\r\n\
1,CONNECT\r\nLink\r\n\r\n+IPD,1,14,10.0.0.9,5123:{\"cmd\":\"ping\"}\r\n\
0,CLOSED\r\nUnlink\r\n";

fn classify_all(input: &[u8]) -> Vec<String> {
    let mut lines = LineAssembler::new();
    let mut events = Vec::new();

    for &byte in input {
        let line = match lines.push(byte) {
            Ok(Some(line)) => line,
            Ok(None) => continue,
            Err(err) => {
                events.push(format!("error: {}", err));
                continue;
            }
        };
        let event = match InboundMessage::classify(line) {
            Ok(InboundMessage::LinkUp) => "link".to_string(),
            Ok(InboundMessage::Data { channel, payload, .. }) => {
                format!("data {} {}", channel, String::from_utf8_lossy(payload))
            }
            Ok(InboundMessage::Unrecognized(_)) => continue,
            Err(err) => format!("error: {}", err),
        };
        events.push(event);
    }

    events
}

#[test]
fn test_transcript_events() {
    assert_eq!(
        classify_all(TRANSCRIPT),
        vec![
            "link",
            "data 0 hello",
            "link",
            "data 1 {\"cmd\":\"ping\"}",
        ]
    );
}

#[test]
fn test_reset_token_found_in_boot_noise() {
    let mut matcher = SubstringMatcher::new(TOKEN_READY.as_bytes());
    let position = TRANSCRIPT.iter().position(|&b| matcher.feed(b));

    let end = position.expect("ready should be found") + 1;
    assert!(TRANSCRIPT[..end].ends_with(b"ready"));
}

#[test]
fn test_address_from_cifsr_output() {
    let output = b"AT+CIFSR\r\n+CIFSR:APIP,\"192.168.4.1\"\r\n+CIFSR:APMAC,\"1a:fe:34:a1:b2:c3\"\r\n\
+CIFSR:STAIP,\"10.0.0.7\"\r\n+CIFSR:STAMAC,\"18:fe:34:a1:b2:c3\"\r\n\r\nOK\r\n";

    assert_eq!(parse_local_address(output), Some(Ipv4Addr::new(10, 0, 0, 7)));
}

#[test]
fn test_setup_commands_encode() {
    let commands = [
        Command::Test,
        Command::SetMultiplex { multi: true },
        Command::StartServer { channel: 1, port: 8000 },
        Command::SetServerTimeout { seconds: 30 },
    ];
    let wire: Vec<u8> = commands.iter().flat_map(|c| c.encode()).collect();

    assert_eq!(
        wire,
        b"AT\r\nAT+CIPMUX=1\r\nAT+CIPSERVER=1,8000\r\nAT+CIPSTO=30\r\n".to_vec()
    );
}
