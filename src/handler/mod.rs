//! Handler module - per-command completions and status subscriptions.
//!
//! Provides:
//! - [`Completion`] - the bundle of ack / nak / response callbacks tied to
//!   one outstanding command
//! - [`StatusRegistry`] - maps substatus values to status handlers
//!
//! All handlers run synchronously on the connection's reader task and must
//! return promptly. Payload slices passed to handlers are only valid for
//! the duration of the call.

mod completion;
mod status;

pub use completion::{AckHandler, Completion, NakHandler, Response, ResponseHandler};
pub use status::{StatusHandler, StatusRegistry};
