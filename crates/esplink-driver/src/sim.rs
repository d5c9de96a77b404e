//! In-memory stand-ins for the hardware collaborators.
//!
//! [`SimulatedModem`] answers AT commands from a table of canned replies and
//! keeps its own clock, so driver timeouts run instantly and deterministically.
//! Used by the test suites and for exercising host code without a module.

use std::collections::VecDeque;
use std::io;
use std::net::Ipv4Addr;

use crate::transport::{EventHandler, Transport, Watchdog};

const SEND_PREFIX: &str = "AT+CIPSEND=";

/// A CIPSEND waiting for its payload bytes.
#[derive(Debug)]
struct PendingSend {
    remaining: usize,
    data: Vec<u8>,
    reply: Option<Vec<u8>>,
}

/// Scripted AT-command module with a simulated millisecond clock.
///
/// Every `now_millis` call advances the clock by the tick (1 ms by default)
/// and `delay_ms` advances it by the requested amount, so every polling loop
/// in the driver terminates.
///
/// Replies are chosen by command prefix; when several rules match, the most
/// recently added wins. Commands with no matching rule get no reply. The
/// reply to `AT+CIPSEND=<ch>,<len>` is held back until `len` payload bytes
/// have been written.
#[derive(Debug, Default)]
pub struct SimulatedModem {
    now_ms: u64,
    tick_ms: u64,
    rx: VecDeque<u8>,
    scheduled: Vec<(u64, Vec<u8>)>,
    written: Vec<u8>,
    line: Vec<u8>,
    commands: Vec<String>,
    payloads: Vec<Vec<u8>>,
    pending_send: Option<PendingSend>,
    rules: Vec<(String, Vec<u8>)>,
    echo: bool,
}

impl SimulatedModem {
    /// A modem that never replies.
    pub fn new() -> Self {
        SimulatedModem {
            tick_ms: 1,
            ..Default::default()
        }
    }

    /// A modem that behaves like a healthy ESP8266 joined to a network as `ip`.
    pub fn esp8266(ip: Ipv4Addr) -> Self {
        let mut modem = SimulatedModem::new();
        modem
            .on_command("AT", b"\r\nOK\r\n")
            .on_command("AT+RST", b"\r\nOK\r\n\r\n ets Jan  8 2013,rst cause:2\r\n\r\nready\r\n")
            .on_command("AT+CWMODE", b"\r\nno change\r\n")
            .on_command(
                "AT+CIFSR",
                format!("+CIFSR:APIP,\"192.168.4.1\"\r\n+CIFSR:STAIP,\"{}\"\r\n\r\nOK\r\n", ip),
            )
            .on_command("AT+CIPSEND", b"\r\nSEND OK\r\n")
            .on_command(
                "AT+CWLAP",
                b"+CWLAP:(3,\"home\",-60,\"aa:bb:cc:dd:ee:ff\",6)\r\n\
                  +CWLAP:(4,\"office\",-72,\"11:22:33:44:55:66\",11)\r\n\r\nOK\r\n",
            );
        modem
    }

    /// Advance the clock by `tick_ms` per `now_millis` call.
    pub fn with_tick(mut self, tick_ms: u64) -> Self {
        self.tick_ms = tick_ms;
        self
    }

    /// Echo each command back before its reply, as modules do after `ATE1`.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Reply with `reply` to commands starting with `prefix`.
    pub fn on_command(&mut self, prefix: &str, reply: impl AsRef<[u8]>) -> &mut Self {
        self.rules.push((prefix.to_string(), reply.as_ref().to_vec()));
        self
    }

    /// Stop replying to commands starting with `prefix`.
    pub fn silence(&mut self, prefix: &str) -> &mut Self {
        self.on_command(prefix, b"")
    }

    /// Make bytes available to read immediately.
    pub fn push_input(&mut self, data: &[u8]) {
        self.rx.extend(data);
    }

    /// Make bytes available once the clock reaches `at_ms`.
    pub fn schedule_input(&mut self, at_ms: u64, data: &[u8]) {
        self.scheduled.push((at_ms, data.to_vec()));
    }

    /// Move the clock forward.
    pub fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
    }

    /// Current time, without advancing the clock.
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Everything the driver has written.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Command lines received, without terminators.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Payloads received after `AT+CIPSEND`.
    pub fn payloads(&self) -> &[Vec<u8>] {
        &self.payloads
    }

    /// Bytes buffered and not yet read, excluding scheduled input.
    pub fn pending_input(&self) -> usize {
        self.rx.len()
    }

    /// Forget everything written so far.
    pub fn clear_log(&mut self) {
        self.written.clear();
        self.commands.clear();
        self.payloads.clear();
    }

    fn release_due(&mut self) {
        if self.scheduled.is_empty() {
            return;
        }
        let now = self.now_ms;
        self.scheduled.sort_by_key(|(at, _)| *at);
        while self.scheduled.first().is_some_and(|(at, _)| *at <= now) {
            let (_, data) = self.scheduled.remove(0);
            self.rx.extend(data);
        }
    }

    fn reply_for(&self, command: &str) -> Option<Vec<u8>> {
        self.rules
            .iter()
            .rev()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map(|(_, reply)| reply.clone())
    }

    fn handle_command(&mut self, command: String) {
        if self.echo {
            self.rx.extend(command.as_bytes());
            self.rx.extend(b"\r\n");
        }
        let reply = self.reply_for(&command);

        let send_length = command
            .strip_prefix(SEND_PREFIX)
            .and_then(|args| args.rsplit(',').next())
            .and_then(|length| length.trim().parse::<usize>().ok());
        self.commands.push(command);

        match send_length {
            Some(0) => {
                self.payloads.push(Vec::new());
                self.rx.extend(reply.unwrap_or_default());
            }
            Some(remaining) => {
                self.pending_send = Some(PendingSend {
                    remaining,
                    data: Vec::with_capacity(remaining),
                    reply,
                });
            }
            None => self.rx.extend(reply.unwrap_or_default()),
        }
    }

    fn accept(&mut self, byte: u8) {
        if let Some(pending) = self.pending_send.as_mut() {
            pending.data.push(byte);
            pending.remaining -= 1;
            if pending.remaining == 0 {
                if let Some(done) = self.pending_send.take() {
                    self.payloads.push(done.data);
                    self.rx.extend(done.reply.unwrap_or_default());
                }
            }
            return;
        }

        self.line.push(byte);
        if self.line.ends_with(b"\r\n") {
            let end = self.line.len() - 2;
            let command = String::from_utf8_lossy(&self.line[..end]).into_owned();
            self.line.clear();
            self.handle_command(command);
        }
    }
}

impl Transport for SimulatedModem {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.written.extend_from_slice(data);
        for &byte in data {
            self.accept(byte);
        }
        Ok(())
    }

    fn available(&mut self) -> usize {
        self.release_due();
        self.rx.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.release_due();
        self.rx.pop_front()
    }

    fn now_millis(&mut self) -> u64 {
        let now = self.now_ms;
        self.now_ms += self.tick_ms;
        now
    }

    fn delay_ms(&mut self, ms: u64) {
        self.now_ms += ms;
    }
}

/// Watchdog that records what the driver asked of it.
///
/// `hard_reset` returns instead of resetting.
#[derive(Debug, Default, Clone)]
pub struct SimulatedWatchdog {
    armed: Option<u32>,
    pulses: usize,
    resets: usize,
}

impl SimulatedWatchdog {
    /// Timeout passed to `arm`, if armed.
    pub fn armed(&self) -> Option<u32> {
        self.armed
    }

    /// Number of pulses.
    pub fn pulses(&self) -> usize {
        self.pulses
    }

    /// Number of hard resets requested.
    pub fn resets(&self) -> usize {
        self.resets
    }
}

impl Watchdog for SimulatedWatchdog {
    fn arm(&mut self, timeout_ms: u32) {
        self.armed = Some(timeout_ms);
    }

    fn pulse(&mut self) {
        self.pulses += 1;
    }

    fn hard_reset(&mut self) {
        self.resets += 1;
    }
}

/// Event handler that keeps every event.
#[derive(Debug, Default, Clone)]
pub struct RecordingHandler {
    /// Payloads in arrival order.
    pub payloads: Vec<Vec<u8>>,
    /// Number of `Link` events.
    pub link_ups: usize,
}

impl EventHandler for RecordingHandler {
    fn on_data(&mut self, payload: &[u8]) {
        self.payloads.push(payload.to_vec());
    }

    fn on_link_up(&mut self) {
        self.link_ups += 1;
    }
}
