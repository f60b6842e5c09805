//! Unified error types for the hatbus driver.
//!
//! A single `Error` enum that every layer converts into: the frame codec
//! reports [`FrameError`], the transport wraps its last failure cause in
//! [`TransferFault`], and the register protocol adds shape/echo and
//! caller-input errors on top.

use core::fmt;

use embedded_hal::i2c::ErrorKind;

use crate::proto::command::Command;

// ---------------------------------------------------------------------------
// Top-level driver error
// ---------------------------------------------------------------------------

/// Every fallible operation in the driver funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Frame construction or decoding failed.
    Frame(FrameError),
    /// Peripheral address is outside the 7-bit range or its board family.
    InvalidAddress { address: u8, base: Option<u8> },
    /// No physical bus handle is present.
    BusUnavailable,
    /// Every transfer attempt failed; carries the last cause.
    Response { attempts: u8, cause: TransferFault },
    /// Response payload had the wrong length or did not echo the request.
    UnexpectedFormat(Command),
    /// Channel index is not below the channel count.
    IndexOutOfRange { index: usize, count: usize },
    /// No channel carries this label.
    UnknownLabel(String),
    /// Counters can only be set to 0.
    InvalidCounterResetValue(u32),
    /// Output value has bits at or above the channel count.
    InvalidValue { value: u32, channels: usize },
    /// Watchdog period is negative, non-finite or too large.
    InvalidPeriod,
    /// The board reported a name that does not match its model.
    UnexpectedBoardIdentity {
        expected: String,
        found: heapless::String<25>,
    },
    /// The board has no digital inputs / outputs.
    UnsupportedCapability(&'static str),
    /// The watchdog feeder thread could not be started.
    Spawn,
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame(e) => write!(f, "frame: {e}"),
            Self::InvalidAddress {
                address,
                base: None,
            } => write!(f, "address {address:#04x} outside [0x00, 0x7f]"),
            Self::InvalidAddress {
                address,
                base: Some(base),
            } => write!(
                f,
                "address {address:#04x} outside [{base:#04x}, {:#04x}]",
                base.saturating_add(0x0F)
            ),
            Self::BusUnavailable => write!(f, "I2C bus not available"),
            Self::Response { attempts, cause } => {
                write!(f, "no valid response after {attempts} attempt(s), last: {cause}")
            }
            Self::UnexpectedFormat(cmd) => write!(f, "unexpected response format for {cmd:?}"),
            Self::IndexOutOfRange { index, count } => {
                write!(f, "channel index {index} out of range (count {count})")
            }
            Self::UnknownLabel(label) => write!(f, "'{label}' is not a valid channel label"),
            Self::InvalidCounterResetValue(v) => {
                write!(f, "counter can only be reset to 0, got {v}")
            }
            Self::InvalidValue { value, channels } => {
                write!(f, "value {value:#x} has bits beyond {channels} channel(s)")
            }
            Self::InvalidPeriod => write!(f, "invalid watchdog period"),
            Self::UnexpectedBoardIdentity { expected, found } => {
                write!(f, "unexpected board name '{found}', expecting '{expected}'")
            }
            Self::UnsupportedCapability(what) => write!(f, "board has no {what}"),
            Self::Spawn => write!(f, "feeder thread spawn failed"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Frame codec errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// A header or payload value does not fit in a byte.
    InvalidByteValue { field: FrameField, value: u32 },
    /// Payload exceeds the frame capacity.
    PayloadTooLong(usize),
    /// Raw response is shorter than the frame overhead.
    Truncated(usize),
    /// Transmitted CRC does not match the recomputed one.
    ChecksumMismatch { expected: u16, received: u16 },
    /// Response id differs from the request id.
    UnexpectedId { expected: u8, received: u8 },
    /// Response command differs from the request command.
    UnexpectedCommand { expected: u8, received: u8 },
    /// Command byte is not part of the protocol.
    UnknownCommand(u8),
}

/// Which frame field a value was destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameField {
    Id,
    Command,
    Payload(usize),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidByteValue { field, value } => {
                write!(f, "{field:?} value {value} does not fit in a byte")
            }
            Self::PayloadTooLong(len) => write!(f, "payload of {len} bytes too long"),
            Self::Truncated(len) => write!(f, "frame of {len} bytes truncated"),
            Self::ChecksumMismatch { expected, received } => write!(
                f,
                "CRC mismatch: expected {expected:#06x}, received {received:#06x}"
            ),
            Self::UnexpectedId { expected, received } => {
                write!(f, "unexpected id {received:#04x}, expecting {expected:#04x}")
            }
            Self::UnexpectedCommand { expected, received } => write!(
                f,
                "unexpected command {received:#04x}, expecting {expected:#04x}"
            ),
            Self::UnknownCommand(byte) => write!(f, "unknown command {byte:#04x}"),
        }
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

// ---------------------------------------------------------------------------
// Transfer failure causes
// ---------------------------------------------------------------------------

/// Why a single transfer attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferFault {
    /// The bus primitive reported an error.
    Io(ErrorKind),
    /// Bytes arrived but did not decode to the expected frame.
    Decode(FrameError),
}

impl fmt::Display for TransferFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(kind) => write!(f, "I/O: {kind}"),
            Self::Decode(e) => write!(f, "decode: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Driver-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
