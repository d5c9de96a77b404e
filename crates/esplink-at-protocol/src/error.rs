//! Error types for the AT protocol.

use thiserror::Error;

/// Errors that can occur when working with the AT protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AtError {
    /// An `+IPD` data header did not have the `<chan>,<len>:` shape.
    #[error("malformed +IPD header: {0}")]
    MalformedIpd(String),

    /// Buffer overflow (line or field too long).
    #[error("buffer overflow: max {max} bytes, got {actual}")]
    BufferOverflow { max: usize, actual: usize },
}

/// Result type alias for AT protocol operations.
pub type AtResult<T> = Result<T, AtError>;
