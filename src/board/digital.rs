//! Digital input and output channel groups.
//!
//! Thin views over a board's exchange: each call resolves the channel
//! reference first (so bad input never reaches the bus) and then runs a
//! single register operation.

use super::channels::{ChannelMap, ChannelRef};
use crate::error::{Error, Result};
use crate::proto::command::{Command, Edge};
use crate::proto::registers::Registers;
use crate::proto::transport::Exchange;

/// Digital inputs with per-channel edge counters.
pub struct DigitalInputs<'a, E: ?Sized> {
    exchange: &'a E,
    channels: &'a ChannelMap,
}

impl<'a, E: Exchange + ?Sized> DigitalInputs<'a, E> {
    pub fn new(exchange: &'a E, channels: &'a ChannelMap) -> Self {
        Self { exchange, channels }
    }

    pub fn labels(&self) -> &[String] {
        self.channels.labels()
    }

    /// All input states, one bit per channel.
    pub fn value(&self) -> Result<u32> {
        self.exchange.get_u32(Command::DiGetAllChannelStates)
    }

    pub fn channel(&self, channel: impl Into<ChannelRef>) -> Result<bool> {
        let index = self.channels.resolve(&channel.into())?;
        self.exchange
            .get_channel_state(Command::DiGetChannelState, index)
    }

    pub fn counter(&self, channel: impl Into<ChannelRef>, edge: Edge) -> Result<u32> {
        let index = self.channels.resolve(&channel.into())?;
        self.exchange.get_counter(index, edge)
    }

    /// Set a counter; `value` must be 0.
    pub fn reset_counter(&self, channel: impl Into<ChannelRef>, edge: Edge, value: u32) -> Result<()> {
        let index = self.channels.resolve(&channel.into())?;
        self.exchange.reset_counter(index, edge, value)
    }

    /// Reset every falling and rising edge counter.
    pub fn reset_counters(&self) -> Result<()> {
        self.exchange.reset_all_counters()
    }
}

/// Digital outputs with power-on and safety (watchdog expiry) values.
pub struct DigitalOutputs<'a, E: ?Sized> {
    exchange: &'a E,
    channels: &'a ChannelMap,
}

impl<'a, E: Exchange + ?Sized> DigitalOutputs<'a, E> {
    pub fn new(exchange: &'a E, channels: &'a ChannelMap) -> Self {
        Self { exchange, channels }
    }

    pub fn labels(&self) -> &[String] {
        self.channels.labels()
    }

    pub fn value(&self) -> Result<u32> {
        self.exchange.get_u32(Command::DqGetAllChannelStates)
    }

    pub fn set_value(&self, value: u32) -> Result<()> {
        self.check_value(value)?;
        self.exchange.set_u32(Command::DqSetAllChannelStates, value)
    }

    pub fn channel(&self, channel: impl Into<ChannelRef>) -> Result<bool> {
        let index = self.channels.resolve(&channel.into())?;
        self.exchange
            .get_channel_state(Command::DqGetChannelState, index)
    }

    pub fn set_channel(&self, channel: impl Into<ChannelRef>, state: bool) -> Result<()> {
        let index = self.channels.resolve(&channel.into())?;
        self.exchange
            .set_channel_state(Command::DqSetChannelState, index, state)
    }

    /// Output states applied at board power-up.
    pub fn power_on_value(&self) -> Result<u32> {
        self.exchange.get_u32(Command::DqGetPowerOnValue)
    }

    pub fn set_power_on_value(&self, value: u32) -> Result<()> {
        self.check_value(value)?;
        self.exchange.set_u32(Command::DqSetPowerOnValue, value)
    }

    /// Output states forced when the communication watchdog expires.
    pub fn safety_value(&self) -> Result<u32> {
        self.exchange.get_u32(Command::DqGetSafetyValue)
    }

    pub fn set_safety_value(&self, value: u32) -> Result<()> {
        self.check_value(value)?;
        self.exchange.set_u32(Command::DqSetSafetyValue, value)
    }

    /// Bits at or above the channel count have no output behind them.
    fn check_value(&self, value: u32) -> Result<()> {
        let channels = self.channels.len();
        if value.checked_shr(channels as u32).unwrap_or(0) != 0 {
            return Err(Error::InvalidValue { value, channels });
        }
        Ok(())
    }
}
