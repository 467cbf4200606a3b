//! Transport layer - one TCP connection to the instrument.
//!
//! Owns the stream, serializes outbound writes so a frame is never
//! interleaved with another, and runs a dedicated reader task that
//! delivers each decoded payload upward through [`ReaderHooks`]. The
//! reader distinguishes user-requested disconnects (silent teardown) from
//! unexpected ones (error report + disconnect signal).

mod tcp;

pub use tcp::TransportConfig;
pub(crate) use tcp::{Connection, ReaderHooks, DEFAULT_PORT};
