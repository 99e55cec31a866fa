use std::fmt;

/// Why a transmitter, receiver or transceiver closed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    /// Closed from outside through `close()`
    ExplicitClosing,

    /// Stop the loops but leave the underlying connection to the owner.
    /// Used internally when a transceiver tears down its halves.
    StoppingProcessOnly,

    /// The inbound stream can no longer be trusted: a read failed, timed
    /// out, or the SMSC sent a PDU that cannot be framed
    InvalidStreaming,

    /// A write failed or timed out
    ConnectionIssue,

    /// The SMSC sent unbind, or a callback asked to close the bind
    UnbindClosing,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::ExplicitClosing => "explicit_closing",
            State::StoppingProcessOnly => "stopping_process_only",
            State::InvalidStreaming => "invalid_streaming",
            State::ConnectionIssue => "connection_issue",
            State::UnbindClosing => "unbind_closing",
        };
        f.write_str(name)
    }
}
