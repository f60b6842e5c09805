//! I2C-HAT frame codec.
//!
//! Wire format:
//! ```text
//! ┌────────┬─────────────┬──────────────────┬─────────┬─────────┐
//! │ Id (1B)│ Command (1B)│ Payload (0..32B) │ CRC lo  │ CRC hi  │
//! └────────┴─────────────┴──────────────────┴─────────┴─────────┘
//! ```
//!
//! The CRC is CRC-16/Modbus over `Id ‖ Command ‖ Payload`. A correct
//! response always echoes the request's id and command bytes, so a
//! response frame is built from its request and then decoded in place.

use heapless::Vec;

use super::command::Command;
use super::crc::crc16_modbus;
use crate::error::{FrameError, FrameField};

/// Largest payload a frame can carry (board name uses 25).
pub const MAX_PAYLOAD: usize = 32;

/// Id + command bytes.
pub const HEADER_SIZE: usize = 2;

/// Trailing CRC-16.
pub const CRC_SIZE: usize = 2;

/// Largest encoded frame.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD + CRC_SIZE;

pub type Payload = Vec<u8, MAX_PAYLOAD>;
pub type RawFrame = Vec<u8, MAX_FRAME_SIZE>;

/// Encoded length of a frame carrying `payload_len` bytes.
pub const fn frame_len(payload_len: usize) -> usize {
    HEADER_SIZE + payload_len + CRC_SIZE
}

/// One protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    id: u8,
    command: Command,
    payload: Payload,
}

impl Frame {
    /// Build a frame. Fails if the payload exceeds [`MAX_PAYLOAD`].
    pub fn new(id: u8, command: Command, payload: &[u8]) -> Result<Self, FrameError> {
        let payload =
            Payload::from_slice(payload).map_err(|()| FrameError::PayloadTooLong(payload.len()))?;
        Ok(Self {
            id,
            command,
            payload,
        })
    }

    /// Build a frame from wider integers, rejecting anything outside 0..=255.
    pub fn from_values(id: u32, command: u32, payload: &[u32]) -> Result<Self, FrameError> {
        let id = to_byte(id, FrameField::Id)?;
        let command = Command::try_from(to_byte(command, FrameField::Command)?)?;
        if payload.len() > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLong(payload.len()));
        }
        let mut bytes = Payload::new();
        for (i, &value) in payload.iter().enumerate() {
            let byte = to_byte(value, FrameField::Payload(i))?;
            bytes
                .push(byte)
                .map_err(|_| FrameError::PayloadTooLong(payload.len()))?;
        }
        Ok(Self {
            id,
            command,
            payload: bytes,
        })
    }

    /// Empty frame carrying the request's id and command, ready for
    /// [`decode`](Self::decode).
    pub fn response_to(request: &Frame) -> Self {
        Self {
            id: request.id,
            command: request.command,
            payload: Payload::new(),
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Encoded length including header and CRC.
    pub fn encoded_len(&self) -> usize {
        frame_len(self.payload.len())
    }

    /// Encode into `out_buf`. Returns the number of bytes written, or
    /// `None` if the buffer is too small.
    pub fn encode_into(&self, out_buf: &mut [u8]) -> Option<usize> {
        let total = self.encoded_len();
        if total > out_buf.len() {
            return None;
        }

        let body_len = HEADER_SIZE + self.payload.len();
        out_buf[0] = self.id;
        out_buf[1] = self.command.byte();
        out_buf[HEADER_SIZE..body_len].copy_from_slice(&self.payload);

        let crc = crc16_modbus(&out_buf[..body_len]);
        out_buf[body_len..total].copy_from_slice(&crc.to_le_bytes());

        Some(total)
    }

    /// Encode to `[id, command, payload.., crc_lo, crc_hi]`.
    pub fn encode(&self) -> RawFrame {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        // Payload is capped at MAX_PAYLOAD, so the buffer always fits.
        let len = self.encode_into(&mut buf).unwrap_or(0);
        buf[..len].iter().copied().collect()
    }

    /// Decode a raw response into this frame.
    ///
    /// The CRC is checked first, then the echoed id and command. On
    /// success the bytes between header and CRC replace the payload.
    pub fn decode(&mut self, raw: &[u8]) -> Result<(), FrameError> {
        if raw.len() < HEADER_SIZE + CRC_SIZE {
            return Err(FrameError::Truncated(raw.len()));
        }

        let (body, crc_bytes) = raw.split_at(raw.len() - CRC_SIZE);
        let received = u16::from_le_bytes([crc_bytes[0], crc_bytes[1]]);
        let expected = crc16_modbus(body);
        if expected != received {
            return Err(FrameError::ChecksumMismatch { expected, received });
        }

        if body[0] != self.id {
            return Err(FrameError::UnexpectedId {
                expected: self.id,
                received: body[0],
            });
        }
        if body[1] != self.command.byte() {
            return Err(FrameError::UnexpectedCommand {
                expected: self.command.byte(),
                received: body[1],
            });
        }

        let data = &body[HEADER_SIZE..];
        self.payload =
            Payload::from_slice(data).map_err(|()| FrameError::PayloadTooLong(data.len()))?;
        Ok(())
    }

    /// Parse a frame with no expectation about its id or command.
    ///
    /// This is the peripheral's view of an incoming request.
    pub fn parse(raw: &[u8]) -> Result<Self, FrameError> {
        let (&id, rest) = raw.split_first().ok_or(FrameError::Truncated(0))?;
        let &command = rest.first().ok_or(FrameError::Truncated(raw.len()))?;
        let mut frame = Self {
            id,
            command: Command::try_from(command)?,
            payload: Payload::new(),
        };
        frame.decode(raw)?;
        Ok(frame)
    }
}

fn to_byte(value: u32, field: FrameField) -> Result<u8, FrameError> {
    u8::try_from(value).map_err(|_| FrameError::InvalidByteValue { field, value })
}
