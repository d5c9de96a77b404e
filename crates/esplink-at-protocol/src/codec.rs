//! Byte-level codec pieces for the AT dialect.
//!
//! Commands go out as text terminated with `\r\n`. Everything coming back is a
//! byte stream that is consumed one byte at a time, either by a
//! [`SubstringMatcher`] while a command waits for its success token, or by a
//! [`LineAssembler`] while the host idles and unsolicited lines arrive.

use bytes::BytesMut;

use crate::error::{AtError, AtResult};

/// Default receive line capacity.
pub const DEFAULT_LINE_CAPACITY: usize = 255;

/// Terminator appended to every command.
pub const COMMAND_TERMINATOR: &[u8] = b"\r\n";

/// Encode a command for transmission, appending the `\r\n` terminator.
pub fn encode_command(cmd: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(cmd.len() + COMMAND_TERMINATOR.len());
    buf.extend_from_slice(cmd.as_bytes());
    buf.extend_from_slice(COMMAND_TERMINATOR);
    buf
}

/// Single-pattern substring search over a byte stream.
///
/// On a mismatch the match restarts, but the mismatching byte is tested
/// against the first byte of the target so `"OOK"` still finds `"OK"`.
/// Overlapping prefixes beyond that are not handled (this is not KMP).
#[derive(Debug, Clone)]
pub struct SubstringMatcher<'a> {
    target: &'a [u8],
    index: usize,
}

impl<'a> SubstringMatcher<'a> {
    /// Create a matcher for the given target.
    pub fn new(target: &'a [u8]) -> Self {
        SubstringMatcher { target, index: 0 }
    }

    /// Feed one byte. Returns `true` once the full target has been seen.
    pub fn feed(&mut self, byte: u8) -> bool {
        if self.target.is_empty() {
            return true;
        }

        if byte != self.target[self.index] {
            self.index = 0;
        }

        if byte == self.target[self.index] {
            self.index += 1;
            if self.index >= self.target.len() {
                self.index = 0;
                return true;
            }
        }

        false
    }

    /// Number of target bytes currently matched.
    pub fn progress(&self) -> usize {
        self.index
    }

}

/// Accumulates bytes into newline-terminated lines.
///
/// - `\n` completes the line
/// - `\r` is dropped
/// - every other byte is appended, up to the fixed capacity
///
/// A completed line is handed out as a borrowed view; it stays valid until the
/// next call to [`push`](Self::push), which starts a fresh line.
#[derive(Debug)]
pub struct LineAssembler {
    buffer: BytesMut,
    capacity: usize,
    /// A line was handed out and must be cleared before the next byte.
    completed: bool,
    /// Dropping bytes until the next terminator.
    overflowed: bool,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl LineAssembler {
    /// Create an assembler with [`DEFAULT_LINE_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LINE_CAPACITY)
    }

    /// Create an assembler holding at most `capacity` bytes per line.
    pub fn with_capacity(capacity: usize) -> Self {
        LineAssembler {
            buffer: BytesMut::with_capacity(capacity),
            capacity,
            completed: false,
            overflowed: false,
        }
    }

    /// Push one byte.
    ///
    /// Returns `Ok(Some(line))` when `byte` terminates a line, `Ok(None)` while
    /// a line is still accumulating. A line longer than the capacity yields a
    /// single [`AtError::BufferOverflow`]; the rest of that line is discarded.
    pub fn push(&mut self, byte: u8) -> AtResult<Option<&[u8]>> {
        if self.completed {
            self.buffer.clear();
            self.completed = false;
        }

        match byte {
            b'\n' => {
                if self.overflowed {
                    self.overflowed = false;
                    self.buffer.clear();
                    return Ok(None);
                }
                self.completed = true;
                Ok(Some(&self.buffer[..]))
            }
            b'\r' => Ok(None),
            _ if self.overflowed => Ok(None),
            _ => {
                if self.buffer.len() >= self.capacity {
                    log::debug!("line overflow after {} bytes", self.buffer.len());
                    self.buffer.clear();
                    self.overflowed = true;
                    return Err(AtError::BufferOverflow {
                        max: self.capacity,
                        actual: self.capacity + 1,
                    });
                }
                self.buffer.extend_from_slice(&[byte]);
                Ok(None)
            }
        }
    }

    /// Bytes of the line currently being assembled.
    pub fn pending(&self) -> &[u8] {
        if self.completed {
            &[]
        } else {
            &self.buffer[..]
        }
    }

    /// Drop any partial line.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.completed = false;
        self.overflowed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(assembler: &mut LineAssembler, data: &[u8]) -> Vec<Vec<u8>> {
        let mut lines = Vec::new();
        for &byte in data {
            if let Ok(Some(line)) = assembler.push(byte) {
                lines.push(line.to_vec());
            }
        }
        lines
    }

    fn matches_in(target: &str, data: &[u8]) -> Option<usize> {
        let mut matcher = SubstringMatcher::new(target.as_bytes());
        data.iter().position(|&b| matcher.feed(b)).map(|i| i + 1)
    }

    #[test]
    fn test_encode_command() {
        assert_eq!(encode_command("AT"), b"AT\r\n");
    }

    #[test]
    fn test_matcher_finds_token() {
        assert_eq!(matches_in("OK", b"\r\nOK\r\n"), Some(4));
    }

    #[test]
    fn test_matcher_restarts_on_first_byte() {
        assert_eq!(matches_in("OK", b"OOK"), Some(3));
        assert_eq!(matches_in("SEND OK", b"SSEND OK"), Some(8));
    }

    #[test]
    fn test_matcher_partial_then_miss() {
        assert_eq!(matches_in("ready", b"rea\r\nerror"), None);
        assert_eq!(matches_in("ready", b"rea\r\nready"), Some(10));
    }

    #[test]
    fn test_matcher_does_not_backtrack_overlaps() {
        // Both need more than one byte of backtrack, so neither is found.
        assert_eq!(matches_in("aab", b"aaab"), None);
        assert_eq!(matches_in("abac", b"ababac"), None);
    }

    #[test]
    fn test_matcher_progress() {
        let mut matcher = SubstringMatcher::new(b"ready");
        matcher.feed(b'r');
        matcher.feed(b'e');
        assert_eq!(matcher.progress(), 2);
        matcher.feed(b'x');
        assert_eq!(matcher.progress(), 0);
    }

    #[test]
    fn test_assembler_splits_lines() {
        let mut assembler = LineAssembler::new();
        let lines = feed_all(&mut assembler, b"Link\r\n+IPD,1,2:hi\r\n");
        assert_eq!(lines, vec![b"Link".to_vec(), b"+IPD,1,2:hi".to_vec()]);
    }

    #[test]
    fn test_assembler_accumulates_without_terminator() {
        let mut assembler = LineAssembler::new();
        let lines = feed_all(&mut assembler, b"partial\rdata");
        assert!(lines.is_empty());
        assert_eq!(assembler.pending(), b"partialdata");
    }

    #[test]
    fn test_assembler_resets_after_terminator() {
        let mut assembler = LineAssembler::new();
        feed_all(&mut assembler, b"first\n");
        assert!(assembler.pending().is_empty());
        let lines = feed_all(&mut assembler, b"second\n");
        assert_eq!(lines, vec![b"second".to_vec()]);
    }

    #[test]
    fn test_assembler_overflow_discards_line() {
        let mut assembler = LineAssembler::with_capacity(4);
        for &b in b"abcd" {
            assert_eq!(assembler.push(b), Ok(None));
        }
        assert_eq!(
            assembler.push(b'e'),
            Err(AtError::BufferOverflow { max: 4, actual: 5 })
        );
        assert_eq!(assembler.push(b'f'), Ok(None));
        assert_eq!(assembler.push(b'\n'), Ok(None));

        let lines = feed_all(&mut assembler, b"ok\n");
        assert_eq!(lines, vec![b"ok".to_vec()]);
    }
}
