//! Completion bundles for outstanding commands.
//!
//! A [`Completion`] carries up to three callbacks: one for the ACK, one
//! for a NAK, and one for the RSP. Any of them may be omitted. Per-command
//! user context travels inside the closures' captures.
//!
//! # Example
//!
//! ```
//! use cortex_client::Completion;
//!
//! let completion = Completion::new()
//!     .on_ack(|seq| println!("command {seq} accepted"))
//!     .on_response(|rsp| println!("status {}: {} bytes", rsp.status_code, rsp.data.len()));
//! ```

use std::fmt;
use std::sync::Arc;

/// Callback invoked when the instrument acknowledges a command.
pub type AckHandler = Arc<dyn Fn(u32) + Send + Sync>;

/// Callback invoked when the instrument rejects a command
/// (sequence, status code).
pub type NakHandler = Arc<dyn Fn(u32, u32) + Send + Sync>;

/// Callback invoked when the instrument answers a command.
pub type ResponseHandler = Arc<dyn Fn(Response<'_>) + Send + Sync>;

/// A decoded command response.
///
/// `data` borrows the inbound frame buffer and is only valid for the
/// duration of the handler call; copy it out if it must outlive the call.
#[derive(Debug, Clone, Copy)]
pub struct Response<'a> {
    /// Sequence number of the completed command.
    pub sequence: u32,
    /// Subcommand echoed back by the instrument.
    pub subcommand: u32,
    /// Instrument status code.
    pub status_code: u32,
    /// Response data (the payload after the fixed RSP header).
    pub data: &'a [u8],
}

/// The bundle of callbacks associated with one outstanding command.
#[derive(Clone, Default)]
pub struct Completion {
    ack: Option<AckHandler>,
    nak: Option<NakHandler>,
    response: Option<ResponseHandler>,
}

impl Completion {
    /// Create an empty completion (all callbacks absent).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ACK callback.
    pub fn on_ack(mut self, f: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.ack = Some(Arc::new(f));
        self
    }

    /// Set the NAK callback.
    pub fn on_nak(mut self, f: impl Fn(u32, u32) + Send + Sync + 'static) -> Self {
        self.nak = Some(Arc::new(f));
        self
    }

    /// Set the response callback.
    pub fn on_response(mut self, f: impl Fn(Response<'_>) + Send + Sync + 'static) -> Self {
        self.response = Some(Arc::new(f));
        self
    }

    pub(crate) fn notify_ack(&self, sequence: u32) {
        if let Some(ack) = &self.ack {
            ack(sequence);
        }
    }

    pub(crate) fn notify_nak(&self, sequence: u32, status_code: u32) {
        if let Some(nak) = &self.nak {
            nak(sequence, status_code);
        }
    }

    pub(crate) fn notify_response(&self, response: Response<'_>) {
        if let Some(handler) = &self.response {
            handler(response);
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("ack", &self.ack.is_some())
            .field("nak", &self.nak.is_some())
            .field("response", &self.response.is_some())
            .finish()
    }
}
