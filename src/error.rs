//! Error types for cortex-client.

use thiserror::Error;

/// Main error type for all client operations.
#[derive(Debug, Error)]
pub enum CortexError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame did not start with the `SYNC` sentinel.
    #[error("Bad SYNC")]
    BadSync,

    /// Declared payload length is outside the accepted range.
    #[error("Bad length: {0}")]
    BadLength(u32),

    /// Frame did not carry the `END ` trailer after the payload.
    #[error("Bad END")]
    BadEnd,

    /// Peer closed the connection in the middle of a frame.
    #[error("Short read: connection closed mid-frame")]
    ShortRead,

    /// Protocol error (truncated control payload, unexpected reply, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Server address could not be parsed as an IPv4 literal.
    #[error("Invalid server address: {0}")]
    InvalidAddress(String),

    /// Operation requires an established session.
    #[error("Not connected")]
    NotConnected,

    /// A session already exists or a connect attempt is in progress.
    #[error("Already connected")]
    AlreadyConnected,

    /// Granted access level does not permit action commands.
    #[error("Access denied: action commands require Master, LocalUI or Engineering access")]
    AccessDenied,

    /// The instrument did not accept the login within the deadline.
    #[error("Login timed out")]
    LoginTimeout,

    /// Connection closed while an operation was waiting on it.
    #[error("Connection closed")]
    ConnectionClosed,
}

/// Result type alias using CortexError.
pub type Result<T> = std::result::Result<T, CortexError>;
