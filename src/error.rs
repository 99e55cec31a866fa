// ABOUTME: Session-level error type shared by the connection, window store and session loops
// ABOUTME: Wraps I/O, codec and store failures and classifies which ones end a connection

use crate::codec::CodecError;
use crate::datatypes::CommandStatus;
use crate::encoding::EncodingError;
use crate::window::StoreError;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Error type for everything above the PDU codec
#[derive(Debug, Error)]
pub enum SmppError {
    /// I/O error during network operations (connect, read, write)
    #[error("Connection error: {0}")]
    Connection(#[from] io::Error),

    /// SMPP protocol error indicated by the command_status field
    #[error("Protocol error: {0:?}")]
    Protocol(CommandStatus),

    /// A PDU could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Message text could not be encoded or segmented
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// A read, write or dial deadline elapsed
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The peer closed the connection
    #[error("Connection closed")]
    ConnectionClosed,

    /// The session or loop has started closing and accepts no more PDUs
    #[error("Connection is closing")]
    Closing,

    /// The request window already holds max_window_size requests
    #[error("Request window is full ({0} outstanding)")]
    WindowFull(usize),

    /// A window operation was asked of a session without window settings
    #[error("Request window is not configured")]
    WindowNotConfigured,

    /// Settings rejected by validation
    #[error("Invalid settings: {0}")]
    InvalidSettings(&'static str),

    /// The request window store failed or timed out
    #[error("Request store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for SMPP session operations
pub type SmppResult<T> = Result<T, SmppError>;

impl SmppError {
    /// Whether this error leaves the transport unusable.
    ///
    /// Window, store, codec and encoding failures concern a single PDU and
    /// leave the stream intact.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SmppError::Connection(_)
                | SmppError::Timeout(_)
                | SmppError::ConnectionClosed
                | SmppError::Closing
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_full_is_not_fatal() {
        assert!(!SmppError::WindowFull(10).is_fatal());
        assert!(!SmppError::Codec(CodecError::Incomplete).is_fatal());
        assert!(SmppError::Timeout(Duration::from_secs(1)).is_fatal());
        assert!(SmppError::from(io::Error::from(io::ErrorKind::BrokenPipe)).is_fatal());
    }

    #[test]
    fn store_errors_convert() {
        let err: SmppError = StoreError::Timeout(Duration::from_millis(5)).into();
        assert!(matches!(err, SmppError::Store(StoreError::Timeout(_))));
    }
}
