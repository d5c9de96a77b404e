//! ESP8266 AT Command Protocol
//!
//! This crate provides types and utilities for talking to an ESP8266-class WiFi
//! co-processor over its UART AT command interface. It is transport agnostic:
//! it formats commands and interprets bytes, and leaves reading and writing
//! the serial port to the caller.
//!
//! # Protocol Overview
//!
//! - **Commands** (host → module): text lines such as `AT+CIPMUX=1`, terminated
//!   with `\r\n`
//! - **Responses** (module → host): free-form text in which the host searches
//!   for a success token (`OK`, `ready`, `SEND OK`)
//! - **Unsolicited lines** (module → host): `Link` when a TCP connection comes
//!   up and `+IPD,<chan>,<len>:<payload>` when data arrives
//!
//! # Example
//!
//! ```rust
//! use esplink_at_protocol::{Command, InboundMessage, LineAssembler, SubstringMatcher};
//!
//! // Build a command
//! let line = Command::SetMultiplex { multi: true }.encode();
//! assert_eq!(line, b"AT+CIPMUX=1\r\n");
//!
//! // Wait for its token
//! let mut matcher = SubstringMatcher::new(b"OK");
//! assert!(b"\r\nOK\r\n".iter().any(|&b| matcher.feed(b)));
//!
//! // Classify unsolicited lines
//! let mut lines = LineAssembler::new();
//! for &b in b"+IPD,3,5:hello\r" {
//!     assert_eq!(lines.push(b), Ok(None));
//! }
//! let line = lines.push(b'\n').unwrap().unwrap();
//! assert!(matches!(
//!     InboundMessage::classify(line),
//!     Ok(InboundMessage::Data { channel: 3, .. })
//! ));
//! ```

mod beacon;
mod codec;
mod commands;
mod error;
mod responses;

pub use beacon::*;
pub use codec::*;
pub use commands::*;
pub use error::*;
pub use responses::*;
