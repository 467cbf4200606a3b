//! Protocol layer - message semantics above the frame envelope.
//!
//! Provides:
//! - [`Tag`] - the four-character message type codes
//! - [`AccessLevel`] - server-granted capability levels
//! - Outbound payload builders ([`login_payload`], [`command_payload`])
//! - Inbound reply views ([`AckFrame`], [`NakFrame`], [`RspFrame`],
//!   [`StatFrame`], [`AcceptFrame`])
//!
//! All multi-byte integers on the wire are Little Endian.

mod messages;
mod wire_format;

pub use messages::{command_payload, login_payload, LoginIdentity, LOGIN_PAYLOAD_SIZE, NAME_FIELD_LEN};
pub use wire_format::{
    AcceptFrame, AccessLevel, AckFrame, NakFrame, RspFrame, StatFrame, Tag, RSP_HEADER_SIZE,
    STAT_HEADER_SIZE, TAG_SIZE,
};
