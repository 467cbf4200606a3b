//! Frame codec for the Cortex wire envelope.
//!
//! Every frame on the wire is:
//! ```text
//! ┌──────────┬───────────┬──────────────┬──────────┐
//! │ "SYNC"   │ length    │ payload      │ "END "   │
//! │ 4 bytes  │ u32 LE    │ length bytes │ 4 bytes  │
//! └──────────┴───────────┴──────────────┴──────────┘
//! ```
//! `length` counts payload bytes only and must satisfy
//! `4 <= length <= max_frame` (the payload always begins with a 4-byte
//! message type tag).
//!
//! Encoding is a pure function. Decoding goes through [`FrameBuffer`], a
//! state machine that accepts arbitrary read chunks and yields complete
//! payloads, validating the `SYNC` sentinel and length bounds as soon as
//! the 8 header bytes are available and the `END ` trailer once the
//! payload is complete. Any validation failure is fatal to the current
//! connection.

use bytes::{Bytes, BytesMut};

use crate::error::{CortexError, Result};

/// Frame start sentinel.
pub const SYNC: [u8; 4] = *b"SYNC";

/// Frame end sentinel (note the trailing space).
pub const END: [u8; 4] = *b"END ";

/// Size of the `SYNC` sentinel plus the length word.
pub const HEADER_SIZE: usize = 8;

/// Size of the `END ` trailer.
pub const TRAILER_SIZE: usize = 4;

/// Smallest legal payload: the 4-byte message type tag alone.
pub const MIN_PAYLOAD_SIZE: u32 = 4;

/// Default maximum payload size (10 MiB).
pub const DEFAULT_MAX_FRAME: u32 = 10 * 1024 * 1024;

/// Encode a payload into a complete wire frame.
///
/// # Example
///
/// ```
/// use cortex_client::codec::encode_frame;
///
/// let frame = encode_frame(b"STATdata");
/// assert_eq!(&frame[..4], b"SYNC");
/// assert_eq!(&frame[4..8], &8u32.to_le_bytes());
/// assert_eq!(&frame[8..16], b"STATdata");
/// assert_eq!(&frame[16..], b"END ");
/// ```
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len() + TRAILER_SIZE);
    buf.extend_from_slice(&SYNC);
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&END);
    buf
}

/// State machine for envelope parsing.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for `SYNC` + length (8 bytes).
    WaitingForHeader,
    /// Header validated, waiting for payload + trailer bytes.
    WaitingForPayload { length: usize },
}

/// Buffer for accumulating incoming bytes and extracting complete payloads.
///
/// Handles partial reads: bytes left over from one push are retained for
/// the next. Validation errors are fatal; after an error the buffer must
/// be discarded along with the connection.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed payload size.
    max_frame: u32,
}

impl FrameBuffer {
    /// Create a frame buffer with the default 10 MiB payload limit.
    pub fn new() -> Self {
        Self::with_max_frame(DEFAULT_MAX_FRAME)
    }

    /// Create a frame buffer with a custom payload limit.
    pub fn with_max_frame(max_frame: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8 * 1024),
            state: State::WaitingForHeader,
            max_frame,
        }
    }

    /// Push data into the buffer and extract all complete payloads.
    ///
    /// Returns the payload bytes of every frame completed by this chunk
    /// (empty if more data is needed).
    ///
    /// # Errors
    ///
    /// [`CortexError::BadSync`] if a frame does not start with `SYNC`,
    /// [`CortexError::BadLength`] if the declared length is out of range,
    /// [`CortexError::BadEnd`] if the trailer is not `END `.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        self.buffer.extend_from_slice(data);

        let mut payloads = Vec::new();
        while let Some(payload) = self.try_extract_one()? {
            payloads.push(payload);
        }
        Ok(payloads)
    }

    /// True if a frame is partially buffered (EOF now would be a short read).
    pub fn has_partial(&self) -> bool {
        !self.buffer.is_empty() || matches!(self.state, State::WaitingForPayload { .. })
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForHeader;
    }

    fn try_extract_one(&mut self) -> Result<Option<Bytes>> {
        match self.state {
            State::WaitingForHeader => {
                if self.buffer.len() < HEADER_SIZE {
                    return Ok(None);
                }

                if self.buffer[..4] != SYNC {
                    return Err(CortexError::BadSync);
                }

                let length = u32::from_le_bytes([
                    self.buffer[4],
                    self.buffer[5],
                    self.buffer[6],
                    self.buffer[7],
                ]);
                if length < MIN_PAYLOAD_SIZE || length > self.max_frame {
                    return Err(CortexError::BadLength(length));
                }

                let _ = self.buffer.split_to(HEADER_SIZE);
                self.state = State::WaitingForPayload {
                    length: length as usize,
                };

                // The payload may already be buffered.
                self.try_extract_one()
            }

            State::WaitingForPayload { length } => {
                if self.buffer.len() < length + TRAILER_SIZE {
                    return Ok(None);
                }

                let payload = self.buffer.split_to(length).freeze();
                let trailer = self.buffer.split_to(TRAILER_SIZE);
                if trailer[..] != END {
                    return Err(CortexError::BadEnd);
                }

                self.state = State::WaitingForHeader;
                Ok(Some(payload))
            }
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let frame = encode_frame(b"GET \x01\x02\x03\x04");
        assert_eq!(&frame[..4], b"SYNC");
        assert_eq!(u32::from_le_bytes(frame[4..8].try_into().unwrap()), 8);
        assert_eq!(&frame[8..16], b"GET \x01\x02\x03\x04");
        assert_eq!(&frame[16..], b"END ");
    }

    #[test]
    fn test_roundtrip_single_frame() {
        let mut buffer = FrameBuffer::new();
        let frame = encode_frame(b"STATpayload");

        let payloads = buffer.push(&frame).unwrap();

        assert_eq!(payloads.len(), 1);
        assert_eq!(&payloads[0][..], b"STATpayload");
        assert!(!buffer.has_partial());
    }

    #[test]
    fn test_roundtrip_multiple_frames_in_one_push() {
        let mut buffer = FrameBuffer::new();
        let mut data = encode_frame(b"ACK \x01\x00\x00\x00");
        data.extend(encode_frame(b"STATfirst"));
        data.extend(encode_frame(b"STATsecond"));

        let payloads = buffer.push(&data).unwrap();

        assert_eq!(payloads.len(), 3);
        assert_eq!(&payloads[1][..], b"STATfirst");
        assert_eq!(&payloads[2][..], b"STATsecond");
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut buffer = FrameBuffer::new();
        let frame = encode_frame(b"RSP \x01\x02\x03\x04");

        let mut all = Vec::new();
        for byte in &frame {
            all.extend(buffer.push(&[*byte]).unwrap());
        }

        assert_eq!(all.len(), 1);
        assert_eq!(&all[0][..], b"RSP \x01\x02\x03\x04");
    }

    #[test]
    fn test_partial_header_then_rest() {
        let mut buffer = FrameBuffer::new();
        let frame = encode_frame(b"STATxy");

        assert!(buffer.push(&frame[..5]).unwrap().is_empty());
        assert!(buffer.has_partial());

        let payloads = buffer.push(&frame[5..]).unwrap();
        assert_eq!(payloads.len(), 1);
        assert!(!buffer.has_partial());
    }

    #[test]
    fn test_partial_payload_is_reported() {
        let mut buffer = FrameBuffer::new();
        let frame = encode_frame(b"STATlong payload here");

        assert!(buffer.push(&frame[..frame.len() - 3]).unwrap().is_empty());
        assert!(buffer.has_partial());
    }

    #[test]
    fn test_bad_sync_rejected() {
        let mut buffer = FrameBuffer::new();
        let mut frame = encode_frame(b"GET \x01\x02\x03\x04");
        frame[2] = b'?';

        assert!(matches!(buffer.push(&frame), Err(CortexError::BadSync)));
    }

    #[test]
    fn test_bad_end_rejected() {
        let mut buffer = FrameBuffer::new();
        let mut frame = encode_frame(b"GET \x01\x02\x03\x04");
        let end_offset = frame.len() - 2;
        frame[end_offset] = b'?';

        assert!(matches!(buffer.push(&frame), Err(CortexError::BadEnd)));
    }

    #[test]
    fn test_length_below_minimum_rejected() {
        let mut buffer = FrameBuffer::new();
        let mut frame = encode_frame(b"GET \x01\x02\x03\x04");
        frame[4..8].copy_from_slice(&3u32.to_le_bytes());

        assert!(matches!(
            buffer.push(&frame),
            Err(CortexError::BadLength(3))
        ));
    }

    #[test]
    fn test_length_above_maximum_rejected() {
        let mut buffer = FrameBuffer::with_max_frame(64);
        let mut frame = encode_frame(b"GET \x01\x02\x03\x04");
        frame[4..8].copy_from_slice(&65u32.to_le_bytes());

        assert!(matches!(
            buffer.push(&frame),
            Err(CortexError::BadLength(65))
        ));
    }

    #[test]
    fn test_single_byte_mutations_rejected() {
        // Any single-byte mutation in SYNC or END must be rejected.
        let clean = encode_frame(b"ACTN\x01\x00\x00\x00\x34\x12\x00\x00");
        let payload_len = clean.len() - HEADER_SIZE - TRAILER_SIZE;

        for i in (0..4).chain(clean.len() - TRAILER_SIZE..clean.len()) {
            let mut mutated = clean.clone();
            mutated[i] ^= 0xFF;

            let mut buffer = FrameBuffer::new();
            let result = buffer.push(&mutated);
            assert!(
                result.is_err(),
                "mutation at byte {} should be rejected",
                i
            );
        }

        // Mutating the length word either fails validation or leaves the
        // buffer waiting for a frame that never completes.
        let mut mutated = clean.clone();
        mutated[4] ^= 0xFF;
        let mut buffer = FrameBuffer::new();
        match buffer.push(&mutated) {
            Err(_) => {}
            Ok(payloads) => {
                assert!(payloads.is_empty() || payloads[0].len() != payload_len);
            }
        }
    }

    #[test]
    fn test_clear_resets_state() {
        let mut buffer = FrameBuffer::new();
        let frame = encode_frame(b"STATpartial");

        buffer.push(&frame[..frame.len() - 1]).unwrap();
        assert!(buffer.has_partial());

        buffer.clear();
        assert!(!buffer.has_partial());

        // A fresh frame parses normally after clear.
        let payloads = buffer.push(&frame).unwrap();
        assert_eq!(payloads.len(), 1);
    }

    #[test]
    fn test_max_frame_boundary_accepted() {
        let mut buffer = FrameBuffer::with_max_frame(16);
        let payload = vec![b'A'; 16];
        let mut framed = b"STAT".to_vec();
        framed.extend_from_slice(&payload[4..]);
        let frame = encode_frame(&framed);

        let payloads = buffer.push(&frame).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].len(), 16);
    }
}
