//! Communication watchdog (CWDT) registers.
//!
//! The board forces its outputs to the safety value when no valid frame
//! arrives within the period. A period of 0 disables the watchdog.
//! Reading the period counts as traffic and re-arms the timer, which is
//! what the [`WatchdogFeeder`](crate::watchdog::WatchdogFeeder) relies on.

use core::time::Duration;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::proto::command::Command;
use crate::proto::registers::Registers;
use crate::proto::transport::Exchange;
use crate::watchdog::channels::{ControlMsg, FeederChannels};

/// Milliseconds per second on the wire.
const MS_PER_SEC: f32 = 1000.0;

pub struct Cwdt<'a, E: ?Sized> {
    exchange: &'a E,
    feeder: Option<Arc<FeederChannels>>,
}

impl<'a, E: Exchange + ?Sized> Cwdt<'a, E> {
    pub fn new(exchange: &'a E) -> Self {
        Self {
            exchange,
            feeder: None,
        }
    }

    /// Notify this feeder after every successful period change.
    pub fn with_feeder(mut self, feeder: Option<Arc<FeederChannels>>) -> Self {
        self.feeder = feeder;
        self
    }

    /// Period in seconds.
    pub fn period(&self) -> Result<f32> {
        Ok(self.period_ms()? as f32 / MS_PER_SEC)
    }

    /// Set the period in seconds; 0 disables the watchdog.
    ///
    /// A running feeder re-reads the new period right away.
    pub fn set_period(&self, seconds: f32) -> Result<()> {
        let ms = seconds * MS_PER_SEC;
        if !ms.is_finite() || ms < 0.0 || ms > u32::MAX as f32 {
            return Err(Error::InvalidPeriod);
        }
        self.exchange.set_u32(Command::CwdtSetPeriod, ms as u32)?;
        if let Some(feeder) = &self.feeder {
            // A full queue already holds an update or a stop.
            let _ = feeder.control.try_send(ControlMsg::Update);
        }
        Ok(())
    }

    /// Raw period register in milliseconds. Also re-arms the watchdog.
    pub fn period_ms(&self) -> Result<u32> {
        self.exchange.get_u32(Command::CwdtGetPeriod)
    }

    pub fn period_duration(&self) -> Result<Duration> {
        Ok(Duration::from_millis(self.period_ms()? as u64))
    }

    /// Write the watchdog state register.
    pub fn set_state(&self, state: u32) -> Result<()> {
        self.exchange.set_u32(Command::CwdtSetState, state)
    }
}
