//! Command bytes understood by I2C-HAT firmware.
//!
//! These values are fixed by the boards already in the field.

use crate::error::FrameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    // ── Board identity ────────────────────────────────────
    GetBoardName = 0x10,
    GetFirmwareVersion = 0x11,
    GetStatusWord = 0x12,
    Reset = 0x13,

    // ── Communication watchdog (CWDT) ─────────────────────
    CwdtSetPeriod = 0x14,
    /// Reading the period also re-arms the board's watchdog.
    CwdtGetPeriod = 0x15,
    CwdtSetState = 0x16,

    // ── Digital inputs ────────────────────────────────────
    DiGetAllChannelStates = 0x20,
    DiGetChannelState = 0x21,
    DiGetCounter = 0x22,
    DiResetCounter = 0x23,
    DiResetAllCounters = 0x24,

    // ── Digital outputs ───────────────────────────────────
    DqSetPowerOnValue = 0x30,
    DqGetPowerOnValue = 0x31,
    DqSetSafetyValue = 0x32,
    DqGetSafetyValue = 0x33,
    DqSetAllChannelStates = 0x34,
    DqGetAllChannelStates = 0x35,
    DqSetChannelState = 0x36,
    DqGetChannelState = 0x37,
}

impl Command {
    /// Wire byte for this command.
    pub const fn byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = FrameError;

    fn try_from(raw: u8) -> Result<Self, FrameError> {
        match raw {
            0x10 => Ok(Self::GetBoardName),
            0x11 => Ok(Self::GetFirmwareVersion),
            0x12 => Ok(Self::GetStatusWord),
            0x13 => Ok(Self::Reset),
            0x14 => Ok(Self::CwdtSetPeriod),
            0x15 => Ok(Self::CwdtGetPeriod),
            0x16 => Ok(Self::CwdtSetState),
            0x20 => Ok(Self::DiGetAllChannelStates),
            0x21 => Ok(Self::DiGetChannelState),
            0x22 => Ok(Self::DiGetCounter),
            0x23 => Ok(Self::DiResetCounter),
            0x24 => Ok(Self::DiResetAllCounters),
            0x30 => Ok(Self::DqSetPowerOnValue),
            0x31 => Ok(Self::DqGetPowerOnValue),
            0x32 => Ok(Self::DqSetSafetyValue),
            0x33 => Ok(Self::DqGetSafetyValue),
            0x34 => Ok(Self::DqSetAllChannelStates),
            0x35 => Ok(Self::DqGetAllChannelStates),
            0x36 => Ok(Self::DqSetChannelState),
            0x37 => Ok(Self::DqGetChannelState),
            _ => Err(FrameError::UnknownCommand(raw)),
        }
    }
}

/// Counter edge selector, sent as the second request byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Edge {
    Falling = 0,
    Rising = 1,
}

impl Edge {
    pub const fn byte(self) -> u8 {
        self as u8
    }
}
