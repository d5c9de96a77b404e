//! Parsing of lines received from the module.
//!
//! Two unsolicited line shapes matter while the host is idle:
//! - `Link`: a TCP connection was accepted or established
//! - `+IPD,<chan>,<len>:<payload>`: inbound data on a channel
//!
//! Everything else (`Unlink`, `OK`, error strings, echoes) is reported as
//! [`InboundMessage::Unrecognized`]. This module also extracts the local
//! address from `AT+CIFSR` output.

use std::net::Ipv4Addr;

use crate::error::{AtError, AtResult};

/// Line announcing an established connection.
pub const LINK_LINE: &[u8] = b"Link";

/// Prefix of an inbound data notification.
pub const IPD_PREFIX: &[u8] = b"+IPD,";

/// A classified inbound line.
///
/// Payloads borrow from the line they were parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundMessage<'a> {
    /// Exactly `Link`.
    LinkUp,

    /// An `+IPD` data notification.
    Data {
        /// Channel the data arrived on.
        channel: u8,
        /// Length declared in the header.
        length: usize,
        /// Rest of the line after the `:` separator (empty when `length` is 0).
        payload: &'a [u8],
    },

    /// Anything else.
    Unrecognized(&'a [u8]),
}

impl<'a> InboundMessage<'a> {
    /// Classify a complete line (terminator already stripped).
    ///
    /// `Link` must match exactly, so `Linky` is unrecognized. A line starting
    /// with `+IPD,` whose header cannot be parsed is an
    /// [`AtError::MalformedIpd`].
    pub fn classify(line: &'a [u8]) -> AtResult<InboundMessage<'a>> {
        if line == LINK_LINE {
            return Ok(InboundMessage::LinkUp);
        }

        if let Some(rest) = line.strip_prefix(IPD_PREFIX) {
            return parse_ipd(line, rest);
        }

        Ok(InboundMessage::Unrecognized(line))
    }
}

/// Parse the part of an `+IPD` line after the prefix.
///
/// Format: `<chan>,<len>[,<extra>...][:<payload>]`. Extra header fields (the
/// remote address some firmware adds) are ignored; the `:` is only required
/// when the declared length is non-zero.
fn parse_ipd<'a>(line: &'a [u8], rest: &'a [u8]) -> AtResult<InboundMessage<'a>> {
    let malformed = || AtError::MalformedIpd(String::from_utf8_lossy(line).to_string());

    let (header, payload) = match rest.iter().position(|&b| b == b':') {
        Some(colon) => (&rest[..colon], Some(&rest[colon + 1..])),
        None => (rest, None),
    };

    let header = std::str::from_utf8(header).map_err(|_| malformed())?;
    let mut fields = header.split(',');

    let channel: u8 = fields
        .next()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(malformed)?;
    let length: usize = fields
        .next()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(malformed)?;

    let payload = if length > 0 {
        payload.ok_or_else(malformed)?
    } else {
        &[]
    };

    Ok(InboundMessage::Data { channel, length, payload })
}

/// Extract the local address from `AT+CIFSR` output.
///
/// Scans for lines with exactly three `.` characters. Both the bare form
/// (`192.168.1.42`) and the tagged form (`+CIFSR:STAIP,"192.168.1.42"`) are
/// accepted. A station address wins over a soft-AP one; otherwise the first
/// address found is used.
pub fn parse_local_address(output: &[u8]) -> Option<Ipv4Addr> {
    let mut first = None;

    for raw in output.split(|&b| b == b'\n') {
        let line = trim_cr(raw);
        if line.iter().filter(|&&b| b == b'.').count() != 3 {
            continue;
        }

        let Some(addr) = address_token(line) else {
            log::trace!("skipping address line {:?}", String::from_utf8_lossy(line));
            continue;
        };

        let is_soft_ap = line.starts_with(b"+CIFSR:APIP");
        if !is_soft_ap {
            return Some(addr);
        }
        first.get_or_insert(addr);
    }

    first
}

/// Broadcast address of the /24 network containing `ip`.
pub fn broadcast_address(ip: Ipv4Addr) -> Ipv4Addr {
    let [a, b, c, _] = ip.octets();
    Ipv4Addr::new(a, b, c, 255)
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn address_token(line: &[u8]) -> Option<Ipv4Addr> {
    let text = std::str::from_utf8(line).ok()?;
    let token = text.rsplit(',').next()?.trim().trim_matches('"');
    token.parse().ok()
}
