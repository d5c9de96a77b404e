//! Inbound line handling.
//!
//! Bytes that arrive while no command is waiting are assembled into lines by
//! the driver's [`LineAssembler`](esplink_at_protocol::LineAssembler) and each
//! complete line is dispatched here.

use esplink_at_protocol::InboundMessage;
use tracing::{debug, trace, warn};

use crate::driver::EspWifi;
use crate::metrics::metric_defs;
use crate::state::{LinkState, SessionState};
use crate::transport::{EventHandler, Transport};

/// What a dispatched line turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Classification {
    LinkUp,
    Data { delivered: bool },
    Ignored,
    Malformed,
}

/// Totals for one pass over the available input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSummary {
    /// Bytes read.
    pub bytes: usize,
    /// Complete lines seen.
    pub lines: usize,
    /// `Link` lines.
    pub links: usize,
    /// Payloads handed to the data callback.
    pub packets: usize,
    /// Lines dropped as oversized or malformed.
    pub dropped: usize,
}

/// Classify one line, update session state, and invoke the handler.
pub(crate) fn dispatch<H: EventHandler>(
    line: &[u8],
    state: &mut SessionState,
    handler: &mut H,
) -> Classification {
    match InboundMessage::classify(line) {
        Ok(InboundMessage::LinkUp) => {
            debug!("MessageClassifier: link up");
            state.link = LinkState::LinkUp;
            metric_defs::LINK_EVENTS.increment();
            handler.on_link_up();
            Classification::LinkUp
        }
        Ok(InboundMessage::Data { channel, length, payload }) => {
            trace!("MessageClassifier: +IPD channel {} length {}", channel, length);
            state.reply_channel = channel;
            metric_defs::PACKETS_RECEIVED.increment();
            if length == 0 {
                return Classification::Data { delivered: false };
            }
            handler.on_data(payload);
            Classification::Data { delivered: true }
        }
        Ok(InboundMessage::Unrecognized(other)) => {
            trace!("MessageClassifier: ignoring {:?}", String::from_utf8_lossy(other));
            Classification::Ignored
        }
        Err(err) => {
            warn!("MessageClassifier: dropping line: {}", err);
            metric_defs::LINES_DROPPED.increment();
            Classification::Malformed
        }
    }
}

impl<T: Transport, W, H: EventHandler> EspWifi<T, W, H> {
    /// Assemble and classify every byte that is available right now.
    ///
    /// Never waits for more input.
    pub fn process_input(&mut self) -> InputSummary {
        let mut summary = InputSummary::default();

        while self.transport.available() > 0 {
            let Some(byte) = self.transport.read_byte() else {
                break;
            };
            summary.bytes += 1;

            match self.lines.push(byte) {
                Ok(Some(line)) => {
                    summary.lines += 1;
                    match dispatch(line, &mut self.state, &mut self.handler) {
                        Classification::LinkUp => summary.links += 1,
                        Classification::Data { delivered: true } => summary.packets += 1,
                        Classification::Malformed => summary.dropped += 1,
                        Classification::Data { delivered: false } | Classification::Ignored => {}
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    warn!("LineAssembler: {}", err);
                    metric_defs::LINES_DROPPED.increment();
                    summary.dropped += 1;
                }
            }
        }

        if !self.lines.pending().is_empty() {
            trace!("MessageClassifier: holding {} bytes of a partial line", self.lines.pending().len());
        }
        summary
    }
}
