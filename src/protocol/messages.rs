//! Outbound payload builders.

use serde::{Deserialize, Serialize};

use super::wire_format::Tag;

/// Size of the username / machine name fields in a LOGN payload.
pub const NAME_FIELD_LEN: usize = 64;

/// Total size of a LOGN payload: tag + access + local address + two names.
pub const LOGIN_PAYLOAD_SIZE: usize = 4 + 4 + 4 + NAME_FIELD_LEN + NAME_FIELD_LEN;

/// Identity announced in the login frame.
///
/// Both fields are encoded as UTF-8 into zero-initialized 64-byte fields
/// and byte-truncated at 64 if longer. The defaults are the constrained
/// device profile literals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginIdentity {
    /// Operator name reported to the instrument.
    pub username: String,
    /// Host machine name reported to the instrument.
    pub machine: String,
}

impl Default for LoginIdentity {
    fn default() -> Self {
        Self {
            username: "Display".to_string(),
            machine: "Cortex".to_string(),
        }
    }
}

fn put_name_field(buf: &mut Vec<u8>, name: &str) {
    let bytes = name.as_bytes();
    let take = bytes.len().min(NAME_FIELD_LEN);
    let mut field = [0u8; NAME_FIELD_LEN];
    field[..take].copy_from_slice(&bytes[..take]);
    buf.extend_from_slice(&field);
}

/// Build a LOGN payload.
///
/// Layout: `"LOGN" | u32 access | 4B local address | 64B username |
/// 64B machine name`.
pub fn login_payload(access: u32, local_addr: [u8; 4], identity: &LoginIdentity) -> Vec<u8> {
    let mut buf = Vec::with_capacity(LOGIN_PAYLOAD_SIZE);
    buf.extend_from_slice(&Tag::Login.code());
    buf.extend_from_slice(&access.to_le_bytes());
    buf.extend_from_slice(&local_addr);
    put_name_field(&mut buf, &identity.username);
    put_name_field(&mut buf, &identity.machine);
    buf
}

/// Build a GET or ACTN payload.
///
/// Layout: `tag | u32 sequence | u32 subcommand | data`.
pub fn command_payload(tag: Tag, sequence: u32, subcommand: u32, data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + 4 + 4 + data.len());
    buf.extend_from_slice(&tag.code());
    buf.extend_from_slice(&sequence.to_le_bytes());
    buf.extend_from_slice(&subcommand.to_le_bytes());
    buf.extend_from_slice(data);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_layout() {
        let identity = LoginIdentity::default();
        let payload = login_payload(2, [192, 168, 0, 17], &identity);

        assert_eq!(payload.len(), LOGIN_PAYLOAD_SIZE);
        assert_eq!(&payload[..4], b"LOGN");
        assert_eq!(u32::from_le_bytes(payload[4..8].try_into().unwrap()), 2);
        assert_eq!(&payload[8..12], &[192, 168, 0, 17]);
        assert_eq!(&payload[12..19], b"Display");
        assert!(payload[19..76].iter().all(|&b| b == 0));
        assert_eq!(&payload[76..82], b"Cortex");
        assert!(payload[82..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_login_name_truncation() {
        let identity = LoginIdentity {
            username: "x".repeat(100),
            machine: "y".repeat(NAME_FIELD_LEN),
        };
        let payload = login_payload(1, [0; 4], &identity);

        assert_eq!(payload.len(), LOGIN_PAYLOAD_SIZE);
        assert!(payload[12..12 + NAME_FIELD_LEN].iter().all(|&b| b == b'x'));
        assert!(payload[76..76 + NAME_FIELD_LEN].iter().all(|&b| b == b'y'));
    }

    #[test]
    fn test_command_layout() {
        let payload = command_payload(Tag::Get, 0xFFFF_FF00, 0x1234, &[0xAA, 0xBB]);

        assert_eq!(&payload[..4], b"GET ");
        assert_eq!(
            u32::from_le_bytes(payload[4..8].try_into().unwrap()),
            0xFFFF_FF00
        );
        assert_eq!(
            u32::from_le_bytes(payload[8..12].try_into().unwrap()),
            0x1234
        );
        assert_eq!(&payload[12..], &[0xAA, 0xBB]);
        assert_eq!(payload.len(), 14);
    }

    #[test]
    fn test_action_command_tag() {
        let payload = command_payload(Tag::Action, 1, 2, &[]);
        assert_eq!(&payload[..4], b"ACTN");
        assert_eq!(payload.len(), 12);
    }
}
