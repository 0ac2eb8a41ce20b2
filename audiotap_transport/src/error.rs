//! Error type for the downstream packet transport.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// A frame ended before its declared fields could be read.
    Truncated,
    /// `message_header.message_type` did not match a known message kind.
    UnknownMessageType(u32),
    /// The transport has no room for another packet right now.
    Full,
    /// The transport has been closed and no longer accepts writes.
    Closed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Truncated => write!(f, "frame truncated before all fields were read"),
            TransportError::UnknownMessageType(t) => write!(f, "unknown message type {t}"),
            TransportError::Full => write!(f, "transport has no free slot for another packet"),
            TransportError::Closed => write!(f, "transport is closed"),
        }
    }
}

impl std::error::Error for TransportError {}

pub type TransportResult<T> = std::result::Result<T, TransportError>;
