//! Wire format: message type tags, access levels and inbound reply views.
//!
//! The first 4 bytes of every payload are a message type tag, a
//! little-endian 32-bit integer whose byte pattern spells an ASCII
//! four-character code (`"GET "`, `"ACK "`, ...). The fixed fields that
//! follow the tag are plain little-endian `u32`/`i32` words.

use serde::{Deserialize, Serialize};

/// Size of the message type tag.
pub const TAG_SIZE: usize = 4;

/// Size of the fixed RSP header: tag + sequence + subcommand + status code.
pub const RSP_HEADER_SIZE: usize = 16;

/// Size of the fixed STAT header: tag + substatus.
pub const STAT_HEADER_SIZE: usize = 8;

/// Message type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Query command (client to server).
    Get,
    /// Action command (client to server, access-gated).
    Action,
    /// Login request (client to server).
    Login,
    /// Login accepted (server to client).
    Accept,
    /// Command acknowledged (server to client).
    Ack,
    /// Command rejected (server to client).
    Nak,
    /// Command response (server to client).
    Response,
    /// Unsolicited status (server to client).
    Status,
}

impl Tag {
    /// The four-character code for this tag.
    pub const fn code(self) -> [u8; 4] {
        match self {
            Tag::Get => *b"GET ",
            Tag::Action => *b"ACTN",
            Tag::Login => *b"LOGN",
            Tag::Accept => *b"ACPT",
            Tag::Ack => *b"ACK ",
            Tag::Nak => *b"NAK ",
            Tag::Response => *b"RSP ",
            Tag::Status => *b"STAT",
        }
    }

    /// Decode a tag from the first 4 payload bytes.
    pub fn from_bytes(code: [u8; 4]) -> Option<Tag> {
        match &code {
            b"GET " => Some(Tag::Get),
            b"ACTN" => Some(Tag::Action),
            b"LOGN" => Some(Tag::Login),
            b"ACPT" => Some(Tag::Accept),
            b"ACK " => Some(Tag::Ack),
            b"NAK " => Some(Tag::Nak),
            b"RSP " => Some(Tag::Response),
            b"STAT" => Some(Tag::Status),
            _ => None,
        }
    }

    /// Decode the tag of a payload, if it carries a known one.
    pub fn of_payload(payload: &[u8]) -> Option<Tag> {
        let code: [u8; 4] = payload.get(..TAG_SIZE)?.try_into().ok()?;
        Tag::from_bytes(code)
    }
}

/// Server-granted capability level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum AccessLevel {
    /// No access granted.
    Invalid = 0,
    /// Read-only access.
    ViewOnly = 1,
    /// Full operator access.
    Master = 2,
    /// Local instrument UI access.
    LocalUi = 3,
    /// Service access.
    Engineering = 1000,
}

impl AccessLevel {
    /// Map a raw wire value to an access level.
    ///
    /// Unknown values map to [`AccessLevel::Invalid`]; the session stays
    /// usable for queries and status.
    pub fn from_raw(raw: i32) -> AccessLevel {
        match raw {
            1 => AccessLevel::ViewOnly,
            2 => AccessLevel::Master,
            3 => AccessLevel::LocalUi,
            1000 => AccessLevel::Engineering,
            _ => AccessLevel::Invalid,
        }
    }

    /// The raw wire value of this level.
    #[inline]
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    /// Whether this level permits ACTN commands.
    #[inline]
    pub fn can_execute_actions(self) -> bool {
        matches!(
            self,
            AccessLevel::Master | AccessLevel::LocalUi | AccessLevel::Engineering
        )
    }
}

#[inline]
fn read_u32(payload: &[u8], offset: usize) -> Option<u32> {
    let bytes: [u8; 4] = payload.get(offset..offset + 4)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

/// Decoded ACPT payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptFrame {
    /// Access level the server actually granted.
    pub granted: i32,
}

impl AcceptFrame {
    /// Parse an ACPT payload (tag included). `None` if truncated.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        Some(Self {
            granted: read_u32(payload, TAG_SIZE)? as i32,
        })
    }
}

/// Decoded ACK payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckFrame {
    /// Sequence number being acknowledged.
    pub sequence: u32,
}

impl AckFrame {
    /// Parse an ACK payload (tag included). `None` if truncated.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        Some(Self {
            sequence: read_u32(payload, TAG_SIZE)?,
        })
    }
}

/// Decoded NAK payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NakFrame {
    /// Sequence number being rejected.
    pub sequence: u32,
    /// Instrument status code explaining the rejection.
    pub status_code: u32,
}

impl NakFrame {
    /// Parse a NAK payload (tag included). `None` if truncated.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        Some(Self {
            sequence: read_u32(payload, TAG_SIZE)?,
            status_code: read_u32(payload, TAG_SIZE + 4)?,
        })
    }
}

/// Decoded RSP header. The response data follows at [`RSP_HEADER_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RspFrame {
    /// Sequence number the response belongs to.
    pub sequence: u32,
    /// Subcommand echoed back by the instrument.
    pub subcommand: u32,
    /// Instrument status code for the command.
    pub status_code: u32,
}

impl RspFrame {
    /// Parse the fixed RSP header (tag included). `None` if truncated.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() < RSP_HEADER_SIZE {
            return None;
        }
        Some(Self {
            sequence: read_u32(payload, TAG_SIZE)?,
            subcommand: read_u32(payload, TAG_SIZE + 4)?,
            status_code: read_u32(payload, TAG_SIZE + 8)?,
        })
    }
}

/// Decoded STAT header. The status data follows at [`STAT_HEADER_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatFrame {
    /// Substatus discriminator used for handler lookup.
    pub substatus: u32,
}

impl StatFrame {
    /// Parse the fixed STAT header (tag included).
    ///
    /// Returns `None` when the payload is shorter than
    /// [`STAT_HEADER_SIZE`]; such frames carry no substatus and are
    /// silently discarded.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() < STAT_HEADER_SIZE {
            return None;
        }
        Some(Self {
            substatus: read_u32(payload, TAG_SIZE)?,
        })
    }
}
