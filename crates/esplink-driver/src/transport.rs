//! Collaborator traits the driver is generic over.
//!
//! Platform code supplies the serial port and clock ([`Transport`]) and the
//! hardware watchdog ([`Watchdog`]); the application supplies an
//! [`EventHandler`] for inbound traffic.

use std::io;

/// Byte-level serial link plus a millisecond clock.
pub trait Transport {
    /// Write bytes to the module.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Number of received bytes that can be read without blocking.
    fn available(&mut self) -> usize;

    /// Read one byte, or `None` if nothing is buffered.
    fn read_byte(&mut self) -> Option<u8>;

    /// Monotonic milliseconds.
    fn now_millis(&mut self) -> u64;

    /// Block for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u64) {
        let start = self.now_millis();
        while self.now_millis().saturating_sub(start) < ms {
            std::hint::spin_loop();
        }
    }
}

/// Hardware watchdog timer.
pub trait Watchdog {
    /// Start the watchdog with the given timeout.
    fn arm(&mut self, timeout_ms: u32);

    /// Signal liveness.
    fn pulse(&mut self);

    /// Force a full device reset.
    ///
    /// This is terminal. The default implementation stops pulsing and spins
    /// until the armed watchdog fires; platforms with a reboot primitive
    /// should call it instead.
    fn hard_reset(&mut self) {
        loop {
            std::hint::spin_loop();
        }
    }
}

/// Watchdog for platforms without one. `hard_reset` still never returns.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWatchdog;

impl Watchdog for NoWatchdog {
    fn arm(&mut self, _timeout_ms: u32) {}

    fn pulse(&mut self) {}
}

/// Receives inbound events from the polling loop.
///
/// Both methods run on the polling thread while the driver is mutably
/// borrowed, so a handler cannot issue serial commands from inside a callback.
pub trait EventHandler {
    /// Data arrived on the current reply channel.
    ///
    /// `payload` borrows the receive line buffer and is only valid for the
    /// duration of the call; copy it to keep it.
    fn on_data(&mut self, payload: &[u8]) {
        let _ = payload;
    }

    /// The module reported `Link`.
    fn on_link_up(&mut self) {}
}

impl EventHandler for () {}
