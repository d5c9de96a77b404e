//! Command/response matching over the serial link.
//!
//! Commands are written and then the response stream is searched for a
//! success token with a [`SubstringMatcher`], one byte at a time, until the
//! token appears or the timeout elapses. There is no response framing; the
//! input is drained before each command so stale bytes cannot satisfy it.

use esplink_at_protocol::{Command, SubstringMatcher};
use tracing::{debug, trace, Level};

use crate::driver::EspWifi;
use crate::error::{WifiError, WifiResult};
use crate::transport::Transport;

/// Sleep between passes while draining input.
const DRAIN_POLL_MS: u64 = 200;

/// Bytes mirrored per trace line.
const MIRROR_CHUNK: usize = 254;

/// Mirrors received bytes into the trace log in fixed-size chunks.
struct Mirror {
    enabled: bool,
    buffer: Vec<u8>,
}

impl Mirror {
    fn new() -> Self {
        let enabled = tracing::enabled!(Level::TRACE);
        Mirror {
            enabled,
            buffer: if enabled { Vec::with_capacity(MIRROR_CHUNK) } else { Vec::new() },
        }
    }

    fn push(&mut self, byte: u8) {
        if !self.enabled {
            return;
        }
        if self.buffer.len() >= MIRROR_CHUNK {
            self.flush();
        }
        self.buffer.push(byte);
    }

    fn flush(&mut self) {
        if self.enabled && !self.buffer.is_empty() {
            trace!("<< {:?}", String::from_utf8_lossy(&self.buffer));
            self.buffer.clear();
        }
    }
}

impl<T: Transport, W, H> EspWifi<T, W, H> {
    /// Read input until `target` appears or `timeout_ms` elapses.
    ///
    /// Returns as soon as the last byte of `target` is read; anything after it
    /// stays buffered in the transport.
    pub fn await_substring(&mut self, target: &str, timeout_ms: u64) -> bool {
        trace!("ResponseMatcher: awaiting {:?} ({} ms)", target, timeout_ms);
        if target.is_empty() {
            return true;
        }

        let mut matcher = SubstringMatcher::new(target.as_bytes());
        let mut mirror = Mirror::new();
        let start = self.transport.now_millis();

        loop {
            if let Some(byte) = self.transport.read_byte() {
                mirror.push(byte);
                if matcher.feed(byte) {
                    mirror.flush();
                    trace!("ResponseMatcher: found {:?}", target);
                    return true;
                }
            }

            if self.transport.now_millis().saturating_sub(start) >= timeout_ms {
                break;
            }
        }

        mirror.flush();
        debug!(
            "ResponseMatcher: no {:?} within {} ms ({} of {} bytes matched)",
            target,
            timeout_ms,
            matcher.progress(),
            target.len()
        );
        false
    }

    /// Discard buffered input, keep discarding for at least
    /// `min_duration_ms`, then discard once more.
    ///
    /// Returns the number of bytes thrown away.
    pub fn drain_input(&mut self, min_duration_ms: u64) -> usize {
        let mut discarded = self.discard_available();

        let start = self.transport.now_millis();
        loop {
            let elapsed = self.transport.now_millis().saturating_sub(start);
            if elapsed >= min_duration_ms {
                break;
            }
            discarded += self.discard_available();
            self.transport
                .delay_ms(DRAIN_POLL_MS.min(min_duration_ms - elapsed));
        }

        discarded += self.discard_available();
        if discarded > 0 {
            trace!("ResponseMatcher: drained {} bytes", discarded);
        }
        discarded
    }

    /// [`drain_input`](Self::drain_input) with no minimum duration.
    pub fn clear_input(&mut self) -> usize {
        self.drain_input(0)
    }

    fn discard_available(&mut self) -> usize {
        let mut count = 0;
        while self.transport.available() > 0 {
            if self.transport.read_byte().is_none() {
                break;
            }
            count += 1;
        }
        count
    }

    /// Write a command line.
    pub(crate) fn write_command(&mut self, command: &Command) -> WifiResult<()> {
        if self.state.halted {
            return Err(WifiError::Halted);
        }
        trace!("ResponseMatcher: >> {}", command.to_command_string());
        self.transport.write(&command.encode())?;
        Ok(())
    }

    /// Drain, write `command`, and wait for its success token.
    ///
    /// Commands without a token return once written.
    pub(crate) fn execute(
        &mut self,
        command: &Command,
        timeout_ms: u64,
        on_failure: impl FnOnce() -> WifiError,
    ) -> WifiResult<()> {
        self.clear_input();
        self.write_command(command)?;

        match command.success_token() {
            Some(token) if !self.await_substring(token, timeout_ms) => Err(on_failure()),
            _ => Ok(()),
        }
    }
}
