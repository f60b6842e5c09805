//! Register-level command protocol.
//!
//! Typed operations on top of [`Exchange`]: each one builds a request,
//! runs a single transfer (which already retried internally) and checks
//! the response shape. Set operations are confirmed by the board echoing
//! the sent payload verbatim; any other reply is
//! [`Error::UnexpectedFormat`] and is not retried again here.

use core::fmt::Write as _;

use super::codec::Frame;
use super::command::{Command, Edge};
use super::transport::Exchange;
use crate::error::{Error, Result};

/// Payload length of a board name response.
pub const BOARD_NAME_LEN: usize = 25;

/// Board name as reported by firmware.
pub type BoardName = heapless::String<BOARD_NAME_LEN>;

/// `v{major}.{minor}.{patch}`; sized for three-digit bytes.
pub type FirmwareVersion = heapless::String<12>;

/// Register operations available on every [`Exchange`].
pub trait Registers: Exchange {
    /// Read a 32-bit little-endian register.
    fn get_u32(&self, command: Command) -> Result<u32> {
        let response = self.roundtrip(command, &[], 4)?;
        let bytes: [u8; 4] = response
            .payload()
            .try_into()
            .map_err(|_| Error::UnexpectedFormat(command))?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Write a 32-bit register and require the board to echo it.
    fn set_u32(&self, command: Command, value: u32) -> Result<()> {
        let data = value.to_le_bytes();
        let response = self.roundtrip(command, &data, data.len())?;
        expect_echo(command, &response, &data)
    }

    /// Read one channel bit. The board answers `[index, state]`.
    fn get_channel_state(&self, command: Command, index: u8) -> Result<bool> {
        let response = self.roundtrip(command, &[index], 2)?;
        match response.payload() {
            &[echoed, state] if echoed == index => Ok(state > 0),
            _ => Err(Error::UnexpectedFormat(command)),
        }
    }

    /// Write one channel bit and require `[index, value]` back.
    fn set_channel_state(&self, command: Command, index: u8, value: bool) -> Result<()> {
        let data = [index, u8::from(value)];
        let response = self.roundtrip(command, &data, data.len())?;
        expect_echo(command, &response, &data)
    }

    /// Read an edge counter. The board answers `[index, edge, u32 LE]`.
    fn get_counter(&self, index: u8, edge: Edge) -> Result<u32> {
        let command = Command::DiGetCounter;
        let response = self.roundtrip(command, &[index, edge.byte()], 6)?;
        match response.payload() {
            &[i, e, b0, b1, b2, b3] if i == index && e == edge.byte() => {
                Ok(u32::from_le_bytes([b0, b1, b2, b3]))
            }
            _ => Err(Error::UnexpectedFormat(command)),
        }
    }

    /// Reset an edge counter. Only `value == 0` is accepted; anything else
    /// fails before the bus is touched.
    fn reset_counter(&self, index: u8, edge: Edge, value: u32) -> Result<()> {
        if value != 0 {
            return Err(Error::InvalidCounterResetValue(value));
        }
        let command = Command::DiResetCounter;
        let data = [index, edge.byte()];
        let response = self.roundtrip(command, &data, data.len())?;
        expect_echo(command, &response, &data)
    }

    /// Reset every counter of every type.
    fn reset_all_counters(&self) -> Result<()> {
        let command = Command::DiResetAllCounters;
        let response = self.roundtrip(command, &[], 0)?;
        expect_echo(command, &response, &[])
    }

    /// Board name: ASCII up to the first zero byte.
    fn board_name(&self) -> Result<BoardName> {
        let command = Command::GetBoardName;
        let response = self.roundtrip(command, &[], BOARD_NAME_LEN)?;
        let mut name = BoardName::new();
        for &byte in response.payload().iter().take_while(|&&b| b != 0) {
            if !byte.is_ascii() {
                return Err(Error::UnexpectedFormat(command));
            }
            name.push(byte as char)
                .map_err(|()| Error::UnexpectedFormat(command))?;
        }
        Ok(name)
    }

    /// Firmware version as `v{b0}.{b1}.{b2}`.
    fn firmware_version(&self) -> Result<FirmwareVersion> {
        let command = Command::GetFirmwareVersion;
        let response = self.roundtrip(command, &[], 3)?;
        let &[major, minor, patch] = response.payload() else {
            return Err(Error::UnexpectedFormat(command));
        };
        let mut version = FirmwareVersion::new();
        write!(version, "v{major}.{minor}.{patch}")
            .map_err(|_| Error::UnexpectedFormat(command))?;
        Ok(version)
    }

    /// Ask the board to reboot. No response is expected.
    fn reset_board(&self) -> Result<()> {
        let request = self.request(Command::Reset, &[])?;
        self.send(&request)
    }

    #[doc(hidden)]
    fn roundtrip(&self, command: Command, payload: &[u8], response_len: usize) -> Result<Frame> {
        let request = self.request(command, payload)?;
        self.transfer(&request, response_len)
    }
}

impl<T: Exchange + ?Sized> Registers for T {}

fn expect_echo(command: Command, response: &Frame, sent: &[u8]) -> Result<()> {
    if response.payload() == sent {
        Ok(())
    } else {
        Err(Error::UnexpectedFormat(command))
    }
}
