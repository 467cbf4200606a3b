//! # cortex-client
//!
//! Rust client SDK for the Cortex instrument-control protocol.
//!
//! The crate speaks the Cortex binary protocol over a single TCP
//! connection: sentinel-framed messages, a login handshake that
//! negotiates an access level, sequence-numbered GET/ACTN commands with
//! ACK / NAK / RSP completions, and unsolicited STAT notifications.
//! An unexpected disconnect starts an automatic reconnect ladder with
//! tiered warning and error notifications.
//!
//! ## Architecture
//!
//! - **codec**: the `SYNC | len | payload | END ` envelope
//! - **protocol**: message tags, access levels, payload builders/views
//! - **transport**: the TCP connection, serialized writes, reader task
//! - **client**: lifecycle state machine, dispatch, reconnect ladder
//!
//! ## Example
//!
//! ```ignore
//! use cortex_client::{AccessLevel, ClientBuilder, Completion};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClientBuilder::new("192.168.0.40")?.build();
//!     client.on_async_error(|description| eprintln!("instrument: {description}"));
//!     client.connect(AccessLevel::Master).await?;
//!
//!     client
//!         .send_get(0x0010, &[], Completion::new().on_response(|rsp| {
//!             println!("response: {:?}", rsp.data);
//!         }))
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod diag;
pub mod error;
pub mod events;
pub mod handler;
pub mod protocol;
pub mod transport;

mod client;
mod inflight;

pub use client::{Client, ClientBuilder, ClientConfig, ConnectionState};
pub use diag::{DiagnosticSink, FileSink, NoopSink};
pub use error::{CortexError, Result};
pub use events::SubscriptionId;
pub use handler::{Completion, Response};
pub use protocol::{AccessLevel, LoginIdentity};
pub use transport::TransportConfig;
